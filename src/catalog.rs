//! Static program data: the seed checklist for auto-provisioned files and
//! the application-category catalog. Everything the rest of the crate knows
//! about categories and seed items comes from these tables.

use crate::model::CategoryListing;

pub const DEFAULT_CATEGORY: &str = "Express Entry";
pub const DEFAULT_STATUS: &str = "New";
pub const DEFAULT_FILE_NOTES: &str = "Default immigration file created automatically";
pub const UNTITLED_DOCUMENT: &str = "Untitled Document";

pub struct SeedItem {
    pub title: &'static str,
    pub description: &'static str,
    pub due_in_days: i64,
}

/// Checklist every auto-provisioned file starts with, in display order.
pub static SEED_CHECKLIST: &[SeedItem] = &[
    SeedItem {
        title: "Complete Personal Information",
        description: "Fill in your personal details in the Immigration File section",
        due_in_days: 7,
    },
    SeedItem {
        title: "Calculate CRS Score",
        description: "Use the CRS Score calculator to determine your ranking",
        due_in_days: 14,
    },
    SeedItem {
        title: "Upload Required Documents",
        description: "Upload all necessary documents for your application",
        due_in_days: 21,
    },
];

pub struct CategoryDef {
    /// Stable slug; also what the active file's category is compared against.
    pub id: &'static str,
    pub name: &'static str,
    pub description: &'static str,
    pub icon: &'static str,
    pub eligibility: &'static [&'static str],
    pub requirements: &'static [&'static str],
    pub processing_time: &'static str,
    pub min_crs: i64,
    pub popularity: &'static str,
}

pub static CATEGORIES: &[CategoryDef] = &[
    CategoryDef {
        id: "express-entry",
        name: "Express Entry",
        description: "Federal Skilled Worker Program application for permanent residency",
        icon: "🇨🇦",
        eligibility: &[
            "At least 1 year of continuous full-time skilled work experience",
            "Language proficiency in English and/or French",
            "Education equivalent to Canadian high school",
            "Meet minimum requirements in all six selection factors",
        ],
        requirements: &[
            "Minimum CLB 7 in all language abilities",
            "Educational Credential Assessment (ECA)",
            "Proof of work experience",
            "Proof of funds ($13,310 for single applicant)",
        ],
        processing_time: "6 months",
        min_crs: 470,
        popularity: "high",
    },
    CategoryDef {
        id: "study-permit",
        name: "Study Permit",
        description: "Student visa application for studying in Canada",
        icon: "🎓",
        eligibility: &[
            "Letter of acceptance from a designated learning institution",
            "Proof of financial support",
            "No criminal record",
            "Good health (medical exam may be required)",
        ],
        requirements: &[
            "Letter of acceptance",
            "Proof of funds",
            "Statement of purpose",
            "Language proficiency test results",
        ],
        processing_time: "4-12 weeks",
        min_crs: 0,
        popularity: "high",
    },
    CategoryDef {
        id: "work-permit",
        name: "Work Permit",
        description: "LMIA-based work permit application",
        icon: "💼",
        eligibility: &[
            "Job offer from Canadian employer",
            "Labour Market Impact Assessment (LMIA)",
            "Meet job requirements",
            "No criminal record",
        ],
        requirements: &[
            "Job offer letter",
            "LMIA (if required)",
            "Proof of qualifications",
            "Medical exam (if required)",
        ],
        processing_time: "8-16 weeks",
        min_crs: 0,
        popularity: "medium",
    },
    CategoryDef {
        id: "family-sponsorship",
        name: "Family Sponsorship",
        description: "Sponsoring spouse for permanent residency in Canada",
        icon: "👪",
        eligibility: &[
            "Canadian citizen or permanent resident sponsor",
            "Meet financial requirements",
            "Eligible relationship to sponsored person",
        ],
        requirements: &[
            "Sponsorship agreement and undertaking",
            "Financial evaluation",
            "Relationship proof",
            "Background checks",
        ],
        processing_time: "12-24 months",
        min_crs: 0,
        popularity: "medium",
    },
    CategoryDef {
        id: "visitor-visa",
        name: "Visitor Visa",
        description: "Temporary resident visa for visiting Canada",
        icon: "✈️",
        eligibility: &[
            "Valid travel document",
            "Good health",
            "No criminal record",
            "Ties to home country",
        ],
        requirements: &[
            "Completed application form",
            "Proof of funds",
            "Travel itinerary",
            "Invitation letter (if applicable)",
        ],
        processing_time: "2-4 weeks",
        min_crs: 0,
        popularity: "medium",
    },
    CategoryDef {
        id: "citizenship",
        name: "Citizenship",
        description: "Canadian citizenship application",
        icon: "📜",
        eligibility: &[
            "Permanent resident status",
            "Physical presence in Canada",
            "Language requirements",
            "Knowledge of Canada",
        ],
        requirements: &[
            "Citizenship test",
            "Language proof",
            "Tax documents",
            "Physical presence calculator",
        ],
        processing_time: "12-18 months",
        min_crs: 0,
        popularity: "low",
    },
    CategoryDef {
        id: "other",
        name: "Other",
        description: "Other immigration programs and applications",
        icon: "📋",
        eligibility: &[
            "Varies by specific program",
            "Consult with immigration consultant",
        ],
        requirements: &[
            "Program-specific requirements",
            "Professional assessment recommended",
        ],
        processing_time: "Varies",
        min_crs: 0,
        popularity: "low",
    },
];

/// Category names are stored verbatim on files; comparisons against catalog
/// ids go through this slug form.
pub fn slug(category: &str) -> String {
    category.to_lowercase().replace(' ', "-")
}

/// The catalog decorated with the selection status derived from the active
/// file's category, if any.
pub fn listings(current_category: Option<&str>) -> Vec<CategoryListing> {
    let selected = current_category.map(slug);
    CATEGORIES
        .iter()
        .map(|def| CategoryListing {
            id: def.id.to_string(),
            name: def.name.to_string(),
            description: def.description.to_string(),
            icon: def.icon.to_string(),
            eligibility: def.eligibility.iter().map(|s| s.to_string()).collect(),
            requirements: def.requirements.iter().map(|s| s.to_string()).collect(),
            processing_time: def.processing_time.to_string(),
            min_crs: def.min_crs,
            popularity: def.popularity.to_string(),
            status: if selected.as_deref() == Some(def.id) {
                "selected".to_string()
            } else {
                "available".to_string()
            },
        })
        .collect()
}
