//! Renderable output blocks and the page layouts built from them.

use fleet_types::GameServer;

use crate::aggregate::{AggregationResult, FailureGroup};
use crate::errors::CommandError;
use crate::paginate::{paginate, Fragment, Page, PageHeader, PageLimits, Renderable, Tone};

/// Split `lines` into fragments titled `title` whose title plus body stay
/// within `max_chars`. Continuations repeat the title with a `(cont.)` suffix.
pub fn chunk_lines(title: &str, lines: &[String], max_chars: usize, is_error: bool) -> Vec<Fragment> {
    let cont_title_len = title.chars().count() + " (cont.)".len();
    let max_chars = max_chars.saturating_sub(cont_title_len).max(1);
    let mut out = Vec::new();
    let mut body = String::new();
    let mut body_len = 0usize;

    for line in lines {
        let line_len = line.chars().count();
        let extra = if body.is_empty() { line_len } else { line_len + 1 };
        if !body.is_empty() && body_len + extra > max_chars {
            out.push(std::mem::take(&mut body));
            body_len = 0;
        }
        if !body.is_empty() {
            body.push('\n');
            body_len += 1;
        }
        body.push_str(line);
        body_len += line_len;
    }
    if !body.is_empty() || out.is_empty() {
        out.push(body);
    }

    out.into_iter()
        .enumerate()
        .map(|(i, body)| {
            let title = if i == 0 { title.to_string() } else { format!("{} (cont.)", title) };
            Fragment {
                title,
                body,
                is_error,
            }
        })
        .collect()
}

fn labels(servers: &[GameServer]) -> Vec<String> {
    servers.iter().map(GameServer::label).collect()
}

/// Servers an action succeeded on, as one block
pub struct ServersDone<'a> {
    pub title: String,
    pub servers: &'a [GameServer],
}

impl ServersDone<'_> {
    pub fn fragments(&self, limits: &PageLimits) -> Vec<Fragment> {
        chunk_lines(&self.title, &labels(self.servers), limits.max_fragment_chars, false)
    }
}

/// A server's player list, e.g. its bans or whitelist
pub struct PlayerList<'a> {
    pub server: &'a GameServer,
    pub players: &'a [String],
    pub empty_text: &'a str,
}

impl Renderable for PlayerList<'_> {
    fn render(&self) -> Fragment {
        let body = if self.players.is_empty() {
            self.empty_text.to_string()
        } else {
            self.players.join("\n")
        };
        let title = if self.server.name.is_empty() {
            self.server.remote_id.to_string()
        } else {
            self.server.name.clone()
        };
        Fragment::new(title, body)
    }
}

/// One line of the `servers` listing
pub struct ServerEntry<'a>(pub &'a GameServer);

impl Renderable for ServerEntry<'_> {
    fn render(&self) -> Fragment {
        Fragment::new(self.0.name.clone(), format!("ID: {}", self.0.remote_id))
    }
}

/// Targets that failed with one shared message
pub struct FailureView<'a> {
    pub group: &'a FailureGroup<String>,
}

impl Renderable for FailureView<'_> {
    fn render(&self) -> Fragment {
        let body = if self.group.targets.is_empty() {
            "Unknown servers".to_string()
        } else {
            self.group.targets.join("\n")
        };
        Fragment::error(self.group.message.clone(), body)
    }
}

pub struct MissingView(pub usize);

impl Renderable for MissingView {
    fn render(&self) -> Fragment {
        Fragment::error(
            "No response",
            format!("{} server(s) did not respond in time", self.0),
        )
    }
}

/// Tone for a finished fan-out: error when nothing succeeded, warn on any loss.
pub fn outcome_tone<K, T>(result: &AggregationResult<K, T>) -> Tone {
    if result.is_clean() {
        Tone::Ok
    } else if result.successes.is_empty() {
        Tone::Error
    } else {
        Tone::Warn
    }
}

/// Error fragments for a fan-out's failures and stragglers.
pub fn failure_fragments<K, T>(result: &AggregationResult<K, T>, label: impl Fn(&K) -> String) -> Vec<Fragment> {
    let mut out: Vec<Fragment> = result
        .failures
        .iter()
        .map(|g| {
            let group = FailureGroup {
                message: g.message.clone(),
                targets: g.targets.iter().map(&label).collect(),
            };
            FailureView { group: &group }.render()
        })
        .collect();
    if result.missing > 0 {
        out.push(MissingView(result.missing).render());
    }
    out
}

/// Pages for a fan-out: successes first, then failures.
pub fn outcome_pages<K, T>(
    header: PageHeader,
    result: &AggregationResult<K, T>,
    successes: Vec<Fragment>,
    label: impl Fn(&K) -> String,
    limits: &PageLimits,
) -> Vec<Page> {
    let header = header.with_tone(outcome_tone(result));
    let mut fragments = successes;
    fragments.extend(failure_fragments(result, label));
    paginate(&header, fragments, limits)
}

/// Page shown when a command ends in an error.
pub fn error_page(title: &str, err: &CommandError, url: Option<String>) -> Page {
    let header = PageHeader::new(title, "")
        .with_url(url)
        .with_tone(Tone::Error);
    let body = err.hint().unwrap_or_default();
    let fragment = Fragment::error(err.user_message(), body);
    let char_count = fragment.char_len();
    Page {
        header,
        fragments: vec![fragment],
        char_count,
    }
}
