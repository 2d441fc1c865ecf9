use std::sync::atomic::{AtomicBool, Ordering};

use chrono::Utc;
use uuid::Uuid;

use crate::models::{Doctor, DoctorSource};
use crate::store::{DirectoryError, ExternalDoctorSource};

const REGISTRY_NAME: &str = "registry";

/// Most entries one lookup returns.
const MAX_RESULTS: usize = 5;

struct Entry {
    first_name: &'static str,
    last_name: &'static str,
    specialty: &'static str,
    registration_number: &'static str,
    address: &'static str,
    postal_code: &'static str,
    city: &'static str,
    phone: &'static str,
}

const CATALOG: &[Entry] = &[
    Entry {
        first_name: "Claire",
        last_name: "Martin",
        specialty: "Médecine générale",
        registration_number: "10001234567",
        address: "12 rue de la République",
        postal_code: "69002",
        city: "Lyon",
        phone: "04 72 00 00 01",
    },
    Entry {
        first_name: "Hugo",
        last_name: "Bernard",
        specialty: "Cardiologie",
        registration_number: "10002345678",
        address: "8 boulevard Longchamp",
        postal_code: "13001",
        city: "Marseille",
        phone: "04 91 00 00 02",
    },
    Entry {
        first_name: "Sophie",
        last_name: "Dubois",
        specialty: "Endocrinologie",
        registration_number: "10003456789",
        address: "3 place du Capitole",
        postal_code: "31000",
        city: "Toulouse",
        phone: "05 61 00 00 03",
    },
    Entry {
        first_name: "Karim",
        last_name: "Haddad",
        specialty: "Pneumologie",
        registration_number: "10004567890",
        address: "41 cours de l'Intendance",
        postal_code: "33000",
        city: "Bordeaux",
        phone: "05 56 00 00 04",
    },
    Entry {
        first_name: "Julie",
        last_name: "Martin",
        specialty: "Pédiatrie",
        registration_number: "10005678901",
        address: "17 rue Nationale",
        postal_code: "59000",
        city: "Lille",
        phone: "03 20 00 00 05",
    },
    Entry {
        first_name: "Thomas",
        last_name: "Lefèvre",
        specialty: "Rhumatologie",
        registration_number: "10006789012",
        address: "5 avenue Jean Médecin",
        postal_code: "06000",
        city: "Nice",
        phone: "04 93 00 00 06",
    },
];

/// In-memory stand-in for a public practitioner registry.
///
/// Serves a fixed catalog, matched by case-insensitive substring. Can be
/// switched into a failing mode to exercise degraded searches.
#[derive(Default)]
pub struct MockRegistry {
    failing: AtomicBool,
}

impl MockRegistry {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn failing() -> Self {
        Self {
            failing: AtomicBool::new(true),
        }
    }

    pub fn set_failing(&self, failing: bool) {
        self.failing.store(failing, Ordering::Relaxed);
    }
}

impl ExternalDoctorSource for MockRegistry {
    fn name(&self) -> &str {
        REGISTRY_NAME
    }

    fn search(&self, query: &str) -> Result<Vec<Doctor>, DirectoryError> {
        if self.failing.load(Ordering::Relaxed) {
            return Err(DirectoryError::Unavailable(format!("{REGISTRY_NAME} is offline")));
        }

        let needle = query.trim().to_lowercase();
        if needle.is_empty() {
            return Ok(Vec::new());
        }

        let now = Utc::now();
        Ok(CATALOG
            .iter()
            .filter(|entry| entry.matches(&needle))
            .take(MAX_RESULTS)
            .map(|entry| Doctor {
                id: Uuid::new_v4(),
                user_id: None,
                first_name: entry.first_name.into(),
                last_name: entry.last_name.into(),
                specialty: Some(entry.specialty.into()),
                registration_number: Some(entry.registration_number.into()),
                address: Some(entry.address.into()),
                postal_code: Some(entry.postal_code.into()),
                city: Some(entry.city.into()),
                phone: Some(entry.phone.into()),
                email: None,
                source: DoctorSource::External(REGISTRY_NAME.into()),
                active: true,
                created_at: now,
                updated_at: now,
            })
            .collect())
    }
}

impl Entry {
    fn matches(&self, needle: &str) -> bool {
        let full = format!("{} {}", self.first_name, self.last_name);
        let reversed = format!("{} {}", self.last_name, self.first_name);
        [
            full.as_str(),
            reversed.as_str(),
            self.specialty,
            self.city,
            self.registration_number,
        ]
        .iter()
        .any(|field| field.to_lowercase().contains(needle))
    }
}
