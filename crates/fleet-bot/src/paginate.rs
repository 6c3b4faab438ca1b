//! Greedy packing of output fragments into fixed-capacity pages.
//!
//! Lengths are counted in `char`s, not bytes. A fragment's length is the
//! length of its title plus its body.

use serde::{Deserialize, Serialize};

/// One titled block of output, rendered as an embed field.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Fragment {
    pub title: String,
    pub body: String,
    pub is_error: bool,
}

impl Fragment {
    pub fn new(title: impl Into<String>, body: impl Into<String>) -> Self {
        Self {
            title: title.into(),
            body: body.into(),
            is_error: false,
        }
    }

    pub fn error(title: impl Into<String>, body: impl Into<String>) -> Self {
        Self {
            title: title.into(),
            body: body.into(),
            is_error: true,
        }
    }

    pub fn char_len(&self) -> usize {
        self.title.chars().count() + self.body.chars().count()
    }
}

/// Anything that can be shown as a [`Fragment`].
pub trait Renderable {
    fn render(&self) -> Fragment;
}

impl Renderable for Fragment {
    fn render(&self) -> Fragment {
        self.clone()
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum Tone {
    #[default]
    Ok,
    Warn,
    Error,
}

#[derive(Debug, Clone, PartialEq, Eq, Default)]
pub struct PageHeader {
    pub title: String,
    pub description: String,
    pub url: Option<String>,
    pub footer: Option<String>,
    pub tone: Tone,
}

impl PageHeader {
    pub fn new(title: impl Into<String>, description: impl Into<String>) -> Self {
        Self {
            title: title.into(),
            description: description.into(),
            ..Self::default()
        }
    }

    pub fn with_footer(mut self, footer: impl Into<String>) -> Self {
        self.footer = Some(footer.into());
        self
    }

    pub fn with_url(mut self, url: Option<String>) -> Self {
        self.url = url;
        self
    }

    pub fn with_tone(mut self, tone: Tone) -> Self {
        self.tone = tone;
        self
    }
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Page {
    pub header: PageHeader,
    pub fragments: Vec<Fragment>,
    pub char_count: usize,
}

impl Page {
    fn empty(header: &PageHeader) -> Self {
        Self {
            header: header.clone(),
            fragments: Vec::new(),
            char_count: 0,
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct PageLimits {
    #[serde(default = "default_char_budget")]
    pub char_budget: usize,
    #[serde(default = "default_max_fields")]
    pub max_fields: usize,
    #[serde(default = "default_max_fragment_chars")]
    pub max_fragment_chars: usize,
}

fn default_char_budget() -> usize {
    5600
}

fn default_max_fields() -> usize {
    23
}

fn default_max_fragment_chars() -> usize {
    800
}

impl Default for PageLimits {
    fn default() -> Self {
        Self {
            char_budget: default_char_budget(),
            max_fields: default_max_fields(),
            max_fragment_chars: default_max_fragment_chars(),
        }
    }
}

/// Discord rejects embed field names longer than this.
pub const MAX_TITLE_CHARS: usize = 256;

fn truncate_chars(s: &mut String, max: usize) {
    if let Some((byte_idx, _)) = s.char_indices().nth(max) {
        s.truncate(byte_idx);
    }
}

/// Cap the title at [`MAX_TITLE_CHARS`] and title plus body at `max_chars`.
fn cap_fragment(fragment: &mut Fragment, max_chars: usize) {
    truncate_chars(&mut fragment.title, MAX_TITLE_CHARS.min(max_chars));
    let title_len = fragment.title.chars().count();
    truncate_chars(&mut fragment.body, max_chars.saturating_sub(title_len));
}

/// Shrink a fragment so it fits on an empty page on its own.
fn fit_alone(mut fragment: Fragment, char_budget: usize) -> Fragment {
    let room = char_budget.saturating_sub(1);
    let title_len = fragment.title.chars().count();
    if title_len >= room {
        truncate_chars(&mut fragment.title, room);
        fragment.body.clear();
    } else {
        truncate_chars(&mut fragment.body, room - title_len);
    }
    fragment
}

/// Pack `fragments` into pages, preserving order.
///
/// A page is sealed before a fragment that would bring it to `char_budget`
/// or beyond, or once it holds `max_fields` fragments. Always returns at
/// least one page.
pub fn paginate(header: &PageHeader, fragments: Vec<Fragment>, limits: &PageLimits) -> Vec<Page> {
    let mut pages = Vec::new();
    let mut current = Page::empty(header);

    for mut fragment in fragments {
        cap_fragment(&mut fragment, limits.max_fragment_chars);
        let len = fragment.char_len();

        if !current.fragments.is_empty()
            && (current.char_count + len >= limits.char_budget
                || current.fragments.len() >= limits.max_fields)
        {
            pages.push(std::mem::replace(&mut current, Page::empty(header)));
        }

        if current.fragments.is_empty() && len >= limits.char_budget {
            fragment = fit_alone(fragment, limits.char_budget);
        }

        current.char_count += fragment.char_len();
        current.fragments.push(fragment);
    }

    pages.push(current);
    pages
}

/// Render and paginate in one step.
pub fn paginate_all<R: Renderable>(header: &PageHeader, items: &[R], limits: &PageLimits) -> Vec<Page> {
    paginate(header, items.iter().map(Renderable::render).collect(), limits)
}

#[cfg(test)]
mod tests {
    use super::*;

    fn limits(char_budget: usize, max_fields: usize) -> PageLimits {
        PageLimits {
            char_budget,
            max_fields,
            max_fragment_chars: 800,
        }
    }

    fn frag(i: usize, len: usize) -> Fragment {
        let title = format!("{:04}", i);
        Fragment::new(title, "x".repeat(len - 4))
    }

    fn header() -> PageHeader {
        PageHeader::new("Banlist", "Players banned per server")
    }

    #[test]
    fn test_thirty_forty_char_fragments_make_three_pages() {
        let fragments: Vec<Fragment> = (0..30).map(|i| frag(i, 40)).collect();
        let pages = paginate(&header(), fragments, &limits(500, 25));

        let sizes: Vec<usize> = pages.iter().map(|p| p.fragments.len()).collect();
        assert_eq!(sizes, vec![12, 12, 6]);
        assert_eq!(pages[0].char_count, 480);
        assert_eq!(pages[2].char_count, 240);
    }

    #[test]
    fn test_field_limit_seals_pages() {
        let fragments: Vec<Fragment> = (0..7).map(|i| frag(i, 5)).collect();
        let pages = paginate(&header(), fragments, &limits(5600, 3));
        let sizes: Vec<usize> = pages.iter().map(|p| p.fragments.len()).collect();
        assert_eq!(sizes, vec![3, 3, 1]);
    }

    #[test]
    fn test_no_fragments_yields_header_only_page() {
        let pages = paginate(&header(), Vec::new(), &PageLimits::default());
        assert_eq!(pages.len(), 1);
        assert!(pages[0].fragments.is_empty());
        assert_eq!(pages[0].header.title, "Banlist");
    }

    #[test]
    fn test_every_page_respects_limits_and_order_is_kept() {
        let lens = [12, 300, 7, 95, 480, 33, 5, 250, 250, 250, 64, 199];
        let fragments: Vec<Fragment> = lens.iter().enumerate().map(|(i, &l)| frag(i, l)).collect();
        let expected = fragments.clone();
        let lim = limits(500, 4);
        let pages = paginate(&header(), fragments, &lim);

        for page in &pages {
            let sum: usize = page.fragments.iter().map(Fragment::char_len).sum();
            assert_eq!(sum, page.char_count);
            assert!(page.char_count < lim.char_budget);
            assert!(page.fragments.len() <= lim.max_fields);
        }
        let flattened: Vec<Fragment> = pages.into_iter().flat_map(|p| p.fragments).collect();
        assert_eq!(flattened, expected);
    }

    #[test]
    fn test_long_bodies_are_cut_to_fragment_cap() {
        let long = Fragment::new("t", "é".repeat(2000));
        let pages = paginate(&header(), vec![long], &PageLimits::default());
        assert_eq!(pages[0].fragments[0].body.chars().count(), 799);
        assert_eq!(pages[0].char_count, 800);
    }

    #[test]
    fn test_long_titles_are_cut_to_field_name_limit() {
        let long = Fragment::error("e".repeat(1000), "(200) - beta");
        let pages = paginate(&header(), vec![long], &PageLimits::default());
        let f = &pages[0].fragments[0];
        assert_eq!(f.title.chars().count(), MAX_TITLE_CHARS);
        assert_eq!(f.body, "(200) - beta");
        assert!(f.char_len() <= 800);
        assert_eq!(pages[0].char_count, f.char_len());
    }

    #[test]
    fn test_title_and_body_share_the_fragment_cap() {
        let lim = PageLimits {
            char_budget: 5600,
            max_fields: 25,
            max_fragment_chars: 100,
        };
        let f = Fragment::new("t".repeat(300), "b".repeat(300));
        let pages = paginate(&header(), vec![f], &lim);
        let f = &pages[0].fragments[0];
        assert_eq!(f.title.chars().count(), 100);
        assert!(f.body.is_empty());
    }

    #[test]
    fn test_oversized_fragment_is_truncated_to_fit_an_empty_page() {
        let lim = PageLimits {
            char_budget: 100,
            max_fields: 25,
            max_fragment_chars: 800,
        };
        let pages = paginate(&header(), vec![frag(0, 10), frag(1, 300)], &lim);
        assert_eq!(pages.len(), 2);
        assert_eq!(pages[1].char_count, 99);
        assert!(pages[1].fragments[0].title.starts_with("0001"));
    }

    #[test]
    fn test_counts_chars_not_bytes() {
        let f = Fragment::new("ñ", "日本");
        assert_eq!(f.char_len(), 3);
    }

    #[test]
    fn test_fragment_renders_itself() {
        let items = vec![Fragment::error("boom", "alpha"), Fragment::new("ok", "beta")];
        let pages = paginate_all(&header(), &items, &PageLimits::default());
        assert_eq!(pages[0].fragments, items);
    }
}
