//! Department routing for classified emails.
//!
//! Every [`Category`] maps to exactly one department through an exhaustive `match`, so a new
//! category cannot compile without a route. Label strings that do not parse to a category go
//! to the generic Registry route.

use std::fmt;
use std::str::FromStr;
use serde::Serialize;

use crate::classifier::ClassifierError;

/// The ten administrative categories the model is trained on.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize)]
pub enum Category {
    AdmissionInquiry,
    FeesAndPayment,
    CourseRegistration,
    ResultGradeIssues,
    HostelAccommodation,
    MeetingRequests,
    TranscriptRequests,
    Complaints,
    GeneralInquiry,
    StaffMatters,
}

impl Category {
    pub const ALL: [Category; 10] = [
        Category::AdmissionInquiry,
        Category::FeesAndPayment,
        Category::CourseRegistration,
        Category::ResultGradeIssues,
        Category::HostelAccommodation,
        Category::MeetingRequests,
        Category::TranscriptRequests,
        Category::Complaints,
        Category::GeneralInquiry,
        Category::StaffMatters,
    ];

    pub fn as_str(&self) -> &'static str {
        match self {
            Self::AdmissionInquiry => "Admission Inquiry",
            Self::FeesAndPayment => "Fees & Payment",
            Self::CourseRegistration => "Course Registration",
            Self::ResultGradeIssues => "Result/Grade Issues",
            Self::HostelAccommodation => "Hostel/Accommodation",
            Self::MeetingRequests => "Meeting Requests",
            Self::TranscriptRequests => "Transcript Requests",
            Self::Complaints => "Complaints",
            Self::GeneralInquiry => "General Inquiry",
            Self::StaffMatters => "Staff Matters",
        }
    }

    pub fn route(&self) -> DepartmentRoute {
        match self {
            Self::AdmissionInquiry => DepartmentRoute::new(
                "Admissions Office",
                "Handles all admission-related inquiries, applications, and requirements.",
                "🎓",
            ),
            Self::FeesAndPayment => DepartmentRoute::new(
                "Bursary Department",
                "Manages tuition fees, payment plans, and financial transactions.",
                "💰",
            ),
            Self::CourseRegistration => DepartmentRoute::new(
                "Academic Affairs Office",
                "Oversees course enrollment, scheduling, and academic programs.",
                "📚",
            ),
            Self::ResultGradeIssues => DepartmentRoute::new(
                "Examination Unit",
                "Addresses grade concerns, result queries, and academic records.",
                "📊",
            ),
            Self::HostelAccommodation => DepartmentRoute::new(
                "Student Affairs Office",
                "Manages student housing, hostel allocation, and accommodation services.",
                "🏠",
            ),
            Self::MeetingRequests => DepartmentRoute::new(
                "Administrative Office",
                "Schedules meetings, appointments, and administrative consultations.",
                "📅",
            ),
            Self::TranscriptRequests => DepartmentRoute::new(
                "Records Office",
                "Processes transcript requests, certificates, and official documents.",
                "📄",
            ),
            Self::Complaints => DepartmentRoute::new(
                "Complaints & Support Desk",
                "Handles grievances, complaints, and student or staff concerns.",
                "⚠️",
            ),
            Self::GeneralInquiry => DepartmentRoute::new(
                "Information Center",
                "Provides general information and directs queries to the right department.",
                "❓",
            ),
            Self::StaffMatters => DepartmentRoute::new(
                "Human Resources",
                "Manages staff employment, contracts, and HR-related matters.",
                "👥",
            ),
        }
    }
}

impl fmt::Display for Category {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for Category {
    type Err = ClassifierError;

    /// Accepts the canonical names with or without spaces around `/` ("Result / Grade Issues").
    /// Matching is case-sensitive.
    fn from_str(s: &str) -> Result<Self, Self::Err> {
        let key = canonical_key(s);
        Category::ALL
            .iter()
            .copied()
            .find(|c| canonical_key(c.as_str()) == key)
            .ok_or_else(|| ClassifierError::UnknownLabel(s.to_string()))
    }
}

fn canonical_key(s: &str) -> String {
    s.split('/')
        .map(|part| part.split_whitespace().collect::<Vec<_>>().join(" "))
        .collect::<Vec<_>>()
        .join("/")
}

/// Department that handles a category.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
pub struct DepartmentRoute {
    pub department: &'static str,
    pub description: &'static str,
    pub icon: &'static str,
}

impl DepartmentRoute {
    const fn new(department: &'static str, description: &'static str, icon: &'static str) -> Self {
        Self { department, description, icon }
    }

    /// Route for labels with no dedicated department.
    pub const REGISTRY: DepartmentRoute = DepartmentRoute::new(
        "Registry",
        "General registry services.",
        "📧",
    );

    pub fn is_fallback(&self) -> bool {
        *self == Self::REGISTRY
    }
}

/// Department route for a category label. Unknown labels get [`DepartmentRoute::REGISTRY`].
pub fn route_for(category: &str) -> DepartmentRoute {
    category
        .parse::<Category>()
        .map(|c| c.route())
        .unwrap_or(DepartmentRoute::REGISTRY)
}

/// Labels that have no dedicated route and would fall back to the Registry.
pub fn unrouted_labels(labels: &[String]) -> Vec<String> {
    labels
        .iter()
        .filter(|label| label.parse::<Category>().is_err())
        .cloned()
        .collect()
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::collections::HashSet;

    #[test]
    fn test_every_category_has_a_dedicated_route() {
        let mut departments = HashSet::new();
        for category in Category::ALL {
            let route = route_for(category.as_str());
            assert!(!route.department.is_empty());
            assert!(!route.is_fallback(), "{} fell back", category);
            departments.insert(route.department);
        }
        assert_eq!(departments.len(), 10);
    }

    #[test]
    fn test_unknown_category_falls_back() {
        assert_eq!(route_for("unknown-category-xyz"), DepartmentRoute::REGISTRY);
        assert_eq!(route_for(""), DepartmentRoute::REGISTRY);
    }

    #[test]
    fn test_spelling_variants() {
        assert_eq!(route_for("Result / Grade Issues").department, "Examination Unit");
        assert_eq!(route_for("Hostel / Accommodation").department, "Student Affairs Office");
        assert_eq!(route_for("  Admission   Inquiry ").department, "Admissions Office");
    }

    #[test]
    fn test_case_mismatch_falls_back() {
        assert_eq!(route_for("ADMISSION INQUIRY"), DepartmentRoute::REGISTRY);
        assert_eq!(route_for("hostel/accommodation"), DepartmentRoute::REGISTRY);
        assert!("complaints".parse::<Category>().is_err());
    }

    #[test]
    fn test_round_trip_names() {
        for category in Category::ALL {
            assert_eq!(category.as_str().parse::<Category>().unwrap(), category);
        }
    }

    #[test]
    fn test_unrouted_labels() {
        let labels = vec!["Complaints".to_string(), "Parking".to_string()];
        assert_eq!(unrouted_labels(&labels), vec!["Parking".to_string()]);
    }
}
