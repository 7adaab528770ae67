use ndarray::Array1;

/// Softmax with the maximum logit subtracted first so large logits cannot overflow `exp`.
pub(crate) fn softmax(logits: &Array1<f32>) -> Array1<f32> {
    if logits.is_empty() {
        return Array1::zeros(0);
    }
    let max = logits.fold(f32::NEG_INFINITY, |acc, &x| acc.max(x));
    let exps = logits.mapv(|x| (x - max).exp());
    let sum = exps.sum();
    exps / sum
}

/// Index of the largest value. The first maximum wins ties.
pub(crate) fn argmax(values: &Array1<f32>) -> Option<usize> {
    let mut best: Option<(usize, f32)> = None;
    for (i, &v) in values.iter().enumerate() {
        match best {
            Some((_, b)) if v <= b => {}
            _ => best = Some((i, v)),
        }
    }
    best.map(|(i, _)| i)
}
