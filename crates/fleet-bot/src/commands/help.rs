//! help: command usage, overall or for one command.

use std::collections::BTreeMap;

use super::Reply;
use crate::bot::FleetBot;
use crate::config::CommandConfig;
use crate::errors::CommandError;
use crate::paginate::{paginate, Fragment};
use crate::views::chunk_lines;

fn usage_line(prefix: &str, spec: &CommandConfig) -> String {
    match &spec.short {
        Some(short) => format!("{}{} (alias {}{})", prefix, spec.usage, prefix, short),
        None => format!("{}{}", prefix, spec.usage),
    }
}

pub(super) fn run(bot: &FleetBot, args: &[String], requester: &str) -> Result<Reply, CommandError> {
    let prefix = &bot.settings.prefix;
    let limits = &bot.settings.limits;
    let title = bot.commands.title(fleet_types::CommandKind::Help);

    if let Some(name) = args.first() {
        let spec = bot
            .commands
            .find(name)
            .filter(|s| s.enabled)
            .ok_or_else(|| CommandError::NotFound(format!("Unknown command: {}", name)))?;
        let header = bot.header(&title, spec.description.clone(), Some(requester));
        let mut fragments = vec![Fragment::new("Usage", usage_line(prefix, spec))];
        if !spec.examples.is_empty() {
            let examples: Vec<String> = spec.examples.iter().map(|e| format!("{}{}", prefix, e)).collect();
            fragments.push(Fragment::new("Examples", examples.join("\n")));
        }
        return Ok(Reply::Pages(paginate(&header, fragments, limits)));
    }

    let mut by_category: BTreeMap<&str, Vec<String>> = BTreeMap::new();
    for spec in bot.commands.iter().filter(|s| s.enabled) {
        let category = if spec.category.is_empty() { "Other" } else { spec.category.as_str() };
        by_category
            .entry(category)
            .or_default()
            .push(format!("{}  {}", usage_line(prefix, spec), spec.description));
    }
    let fragments = by_category
        .into_iter()
        .flat_map(|(category, lines)| chunk_lines(category, &lines, limits.max_fragment_chars, false))
        .collect();
    let header = bot.header(
        &title,
        format!("Run {}help <command> for details", prefix),
        Some(requester),
    );
    Ok(Reply::Pages(paginate(&header, fragments, limits)))
}
