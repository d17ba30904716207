//! Generated `/help` command.

use tracing::debug;

use crate::details::HandlerDetails;
use crate::handler::Handler;
use crate::text::strip_command;

/// Group for entries without a `group` annotation.
pub const DEFAULT_GROUP: &str = "Other";

/// Render help blocks, one per group in order of first appearance.
///
/// Entries with neither name nor description are skipped. A non-empty
/// `query` keeps entries whose name or description contains it, ignoring
/// case. Returns no blocks when nothing is left to show.
pub fn render_help(details: &[HandlerDetails], query: Option<&str>) -> Vec<String> {
    let query = query
        .map(|q| q.trim().to_lowercase())
        .filter(|q| !q.is_empty());

    let mut groups: Vec<(&str, Vec<String>)> = Vec::new();
    for entry in details.iter().filter(|d| d.is_documented()) {
        if let Some(query) = &query {
            if !entry.matches(query) {
                continue;
            }
        }
        let group = entry.group.as_deref().unwrap_or(DEFAULT_GROUP);
        let line = entry.render_line();
        match groups.iter_mut().find(|(name, _)| *name == group) {
            Some((_, lines)) => lines.push(line),
            None => groups.push((group, vec![line])),
        }
    }

    groups
        .into_iter()
        .map(|(group, lines)| format!("*{}*\n{}", group, lines.join("\n")))
        .collect()
}

impl Handler {
    /// Wrap this tree with a `/help [query]` command tried before it.
    ///
    /// The listing is built from [`Handler::details`] of the wrapped tree on
    /// every request; `/help` itself never falls through to the tree.
    pub fn help(&self) -> Handler {
        let tree = self.clone();
        let help = Handler::act(move |ctx| {
            let tree = tree.clone();
            async move {
                let query = strip_command(ctx.text());
                let query = (!query.is_empty()).then_some(query);
                let blocks = render_help(&tree.details(), query);
                debug!("Rendering {} help group(s)", blocks.len());

                match (blocks.is_empty(), query) {
                    (true, Some(query)) => {
                        ctx.reply_with_markdown(&format!("No commands match *{}*", query))
                    }
                    (true, None) => ctx.reply("No commands available."),
                    (false, _) => {
                        for block in &blocks {
                            ctx.reply_with_markdown(block);
                        }
                    }
                }
                Ok(())
            }
        })
        .description("List commands, optionally filtered by a search term")
        .command(&["help"]);

        Handler::first_only([help, self.clone()])
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn entry(name: &str, description: &str, group: Option<&str>) -> HandlerDetails {
        HandlerDetails {
            name: Some(name.to_string()),
            description: Some(description.to_string()),
            requirements: Vec::new(),
            group: group.map(str::to_string),
        }
    }

    #[test]
    fn test_render_groups_in_first_appearance_order() {
        let details = vec![
            entry("/tasks", "List tasks", Some("Tasks")),
            entry("/feedback", "Send feedback", None),
            entry("/task add", "Add a task", Some("Tasks")),
            HandlerDetails::default(),
        ];

        let blocks = render_help(&details, None);

        assert_eq!(
            blocks,
            vec![
                "*Tasks*\n/tasks - List tasks\n/task add - Add a task".to_string(),
                "*Other*\n/feedback - Send feedback".to_string(),
            ]
        );
    }

    #[test]
    fn test_render_query_filters() {
        let details = vec![
            entry("/tasks", "List tasks", Some("Tasks")),
            entry("/feedback", "Send FEEDBACK", None),
        ];

        let blocks = render_help(&details, Some("Feed"));
        assert_eq!(blocks, vec!["*Other*\n/feedback - Send FEEDBACK".to_string()]);

        assert!(render_help(&details, Some("karma")).is_empty());
        assert_eq!(render_help(&details, Some("  ")).len(), 2);
    }
}
