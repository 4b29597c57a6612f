use serde::{Deserialize, Serialize};

/// Domain model for a configured child.
///
/// Children are configured externally and immutable during a scrape pass.
/// A child may be associated with several classroom labels at once (and may
/// move classrooms over time); attribution always uses the mapping that is
/// active at scrape time.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Child {
    pub id: String,
    pub name: String,
    /// Classroom labels currently associated with this child, as they appear
    /// in the feed's "Recorded by" marker (e.g. "Infant C")
    pub classrooms: Vec<String>,
}

impl Child {
    pub fn new(name: &str, classrooms: Vec<String>) -> Self {
        Self {
            id: Self::generate_id(name),
            name: name.trim().to_string(),
            classrooms,
        }
    }

    /// Generate a stable ID for a child from its configured name
    pub fn generate_id(name: &str) -> String {
        let slug: String = name
            .trim()
            .to_lowercase()
            .chars()
            .map(|c| if c.is_alphanumeric() { c } else { '-' })
            .collect();
        format!("child::{}", slug)
    }

    /// First name, used for log lines and name-mention matching
    pub fn first_name(&self) -> &str {
        self.name.split_whitespace().next().unwrap_or(&self.name)
    }
}
