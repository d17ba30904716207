//! Help metadata collected from annotated routes.

use serde::Serialize;

/// Annotations reachable from one leaf.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize)]
pub struct HandlerDetails {
    pub name: Option<String>,
    pub description: Option<String>,
    pub requirements: Vec<String>,
    pub group: Option<String>,
}

impl HandlerDetails {
    /// Whether there is anything to show for this entry.
    pub fn is_documented(&self) -> bool {
        self.name.is_some() || self.description.is_some()
    }

    /// Case-insensitive substring match against name or description.
    ///
    /// `query` must already be lowercase.
    pub fn matches(&self, query: &str) -> bool {
        [&self.name, &self.description]
            .into_iter()
            .flatten()
            .any(|field| field.to_lowercase().contains(query))
    }

    /// One help line, e.g. `/init - Begin a group _(group chat)_`.
    pub fn render_line(&self) -> String {
        let mut line = match (&self.name, &self.description) {
            (Some(name), Some(description)) => format!("{} - {}", name, description),
            (Some(name), None) => name.clone(),
            (None, Some(description)) => description.clone(),
            (None, None) => String::new(),
        };
        if !self.requirements.is_empty() {
            line.push_str(&format!(" _({})_", self.requirements.join(", ")));
        }
        line
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn entry(name: &str, description: &str) -> HandlerDetails {
        HandlerDetails {
            name: Some(name.to_string()),
            description: Some(description.to_string()),
            ..Default::default()
        }
    }

    #[test]
    fn test_matches_is_case_insensitive_on_either_field() {
        let details = entry("/listfeedback", "Anonymously list all provided Feedback");
        assert!(details.matches("feedback"));
        assert!(details.matches("anonym"));
        assert!(!details.matches("task"));
    }

    #[test]
    fn test_render_line_with_requirements() {
        let mut details = entry("/add", "Add members");
        details.requirements = vec!["@mention a user".to_string(), "group chat".to_string()];
        assert_eq!(
            details.render_line(),
            "/add - Add members _(@mention a user, group chat)_"
        );
    }

    #[test]
    fn test_undocumented_entry() {
        let details = HandlerDetails {
            group: Some("Tasks".to_string()),
            ..Default::default()
        };
        assert!(!details.is_documented());
        assert!(!details.matches(""));
    }
}
