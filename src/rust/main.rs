use std::io::{self, BufRead, Write};
use std::path::PathBuf;
use std::sync::Arc;
use std::time::Instant;

use anyhow::{bail, Context, Result};
use clap::Parser;
use log::info;
use triage::global::{self, ProcessClassifier};
use triage::shell::{CpuFallback, Notice, ShellEvent, View, ViewModel, SAMPLE_EMAILS};
use triage::{ClassifierBundle, Device, EmailClassifier, ModelError, ModelManager, TriageConfig};

#[derive(Parser)]
#[command(author, version, about = "Classify school-registry emails and route them to a department", long_about = None)]
struct Args {
    /// Directory holding model.onnx, tokenizer.json and labels.json
    #[arg(short, long)]
    model_dir: Option<PathBuf>,

    /// Compute device: auto, cpu or cuda
    #[arg(short, long)]
    device: Option<String>,

    /// Fetch or verify the artifacts listed in the directory's manifest.json before loading
    #[arg(short, long)]
    fetch: bool,

    /// Subject line to classify
    #[arg(short, long)]
    subject: Option<String>,

    /// Email body to classify
    #[arg(short, long)]
    body: Option<String>,

    /// Classify one of the bundled sample emails (1-based)
    #[arg(long)]
    sample: Option<usize>,

    /// Print the result as JSON
    #[arg(long)]
    json: bool,

    /// Number of classes shown in the probability chart
    #[arg(long, default_value_t = 5)]
    top: usize,
}

async fn ensure_artifacts(config: &TriageConfig) -> Result<()> {
    let manager = ModelManager::new(&config.model_dir)?;
    let manifest = manager
        .load_manifest()?
        .ok_or_else(|| ModelError::NotDownloaded(format!("{:?} (no manifest.json)", config.model_dir)))?;
    manager.ensure_model_downloaded(&manifest).await?;
    Ok(())
}

fn print_outcome(vm: &ViewModel, json: bool, top: usize) -> Result<()> {
    if let Some(notice) = vm.notice() {
        eprintln!("{}", notice.message());
        match notice {
            Notice::Failed(_) => eprintln!("Consider retrying with --device cpu."),
            Notice::Unavailable(_) => eprintln!("Check the model artifacts in the model directory."),
            Notice::EmptyInput => {}
        }
        return Ok(());
    }
    if let Some(report) = vm.report() {
        if json {
            println!("{}", serde_json::to_string_pretty(report)?);
        } else {
            println!("\n{}", report.render(top));
            if report.tier.needs_review() {
                println!("  Low confidence: review before routing.");
            }
        }
    }
    Ok(())
}

fn prompt(stdin: &mut impl BufRead, label: &str) -> Result<Option<String>> {
    print!("{}", label);
    io::stdout().flush()?;
    let mut line = String::new();
    if stdin.read_line(&mut line)? == 0 {
        return Ok(None);
    }
    Ok(Some(line.trim_end_matches(['\r', '\n']).to_string()))
}

fn interactive(vm: &mut ViewModel, classifier: &dyn EmailClassifier, top: usize) -> Result<()> {
    println!("Registry email triage. Commands: :sample N, :clear, :home, :quit");
    for (i, sample) in SAMPLE_EMAILS.iter().enumerate() {
        println!("  :sample {}  {}", i + 1, sample.title);
    }

    let stdin = io::stdin();
    let mut stdin = stdin.lock();
    vm.handle(ShellEvent::OpenClassifier, classifier);

    loop {
        let Some(line) = prompt(&mut stdin, "\nSubject> ")? else { break };
        let command: Vec<&str> = line.split_whitespace().collect();
        match command.as_slice() {
            [":quit"] | [":q"] => break,
            [":home"] => {
                vm.handle(ShellEvent::GoHome, classifier);
                println!("Back on the landing view. Type :open to classify again.");
                continue;
            }
            [":open"] => {
                vm.handle(ShellEvent::OpenClassifier, classifier);
                continue;
            }
            [":clear"] => {
                vm.handle(ShellEvent::Clear, classifier);
                continue;
            }
            [":sample", n] => {
                match n.parse::<usize>() {
                    Ok(n) if n >= 1 => vm.handle(ShellEvent::PickSample(n - 1), classifier),
                    _ => {
                        eprintln!("Sample number must be between 1 and {}", SAMPLE_EMAILS.len());
                        continue;
                    }
                }
                println!("Subject: {}\nBody: {}", vm.subject(), vm.body());
            }
            _ => {
                if vm.view() == View::Landing {
                    println!("Type :open to start classifying.");
                    continue;
                }
                vm.handle(ShellEvent::SetSubject(line.clone()), classifier);
                let Some(body) = prompt(&mut stdin, "Body> ")? else { break };
                vm.handle(ShellEvent::SetBody(body), classifier);
            }
        }

        if vm.view() == View::Classifying {
            vm.handle(ShellEvent::Submit, classifier);
            print_outcome(vm, false, top)?;
        }
    }
    Ok(())
}

#[tokio::main]
async fn main() -> Result<()> {
    triage::init_logger();
    let args = Args::parse();

    let mut config = TriageConfig::from_env()?;
    if let Some(dir) = args.model_dir {
        config.model_dir = dir;
    }
    if let Some(device) = args.device.as_deref() {
        config = config.with_device(device.parse::<Device>()?);
    }

    if args.fetch {
        ensure_artifacts(&config).await.context("Failed to provision model artifacts")?;
    }

    let start = Instant::now();
    info!("Loading classifier from {:?}...", config.model_dir);
    global::init(&config).context("Classifier could not be loaded; no emails can be triaged")?;
    let info = global::info()?;
    info!(
        "Classifier ready in {:.2?}: {} classes, {} tokens, device {}",
        start.elapsed(),
        info.num_classes,
        info.max_length,
        info.device
    );

    let cpu_config = config.with_device(Device::Cpu);
    let classifier = CpuFallback::new(ProcessClassifier, info.device, move || {
        Ok(Arc::new(ClassifierBundle::load(&cpu_config)?) as Arc<dyn EmailClassifier>)
    });
    let mut vm = ViewModel::new();

    let one_shot = args.subject.is_some() || args.body.is_some() || args.sample.is_some();
    if !one_shot {
        return interactive(&mut vm, &classifier, args.top);
    }

    vm.handle(ShellEvent::OpenClassifier, &classifier);
    if let Some(n) = args.sample {
        if n == 0 || n > SAMPLE_EMAILS.len() {
            bail!("--sample must be between 1 and {}", SAMPLE_EMAILS.len());
        }
        vm.handle(ShellEvent::PickSample(n - 1), &classifier);
    }
    if let Some(subject) = args.subject {
        vm.handle(ShellEvent::SetSubject(subject), &classifier);
    }
    if let Some(body) = args.body {
        vm.handle(ShellEvent::SetBody(body), &classifier);
    }
    vm.handle(ShellEvent::Submit, &classifier);

    print_outcome(&vm, args.json, args.top)?;
    if vm.notice().is_some() {
        bail!("Email was not classified");
    }
    Ok(())
}
