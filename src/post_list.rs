use std::cmp::Ordering;
use std::collections::{BTreeSet, HashMap};

use serde::Serialize;

use crate::frontmatter::{dedup, Frontmatter};
use crate::query_string::QueryString;
use crate::util::post_date::PostDate;
use crate::util::slug::slug_from_id;

pub const RECENT_POSTS: usize = 5;

#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct PostSummary {
    pub id: String,
    pub slug: String,
    pub title: String,
    pub date: PostDate,
    pub updated: Option<PostDate>,
    pub categories: Vec<String>,
    pub tags: Vec<String>,
    pub draft: bool,
    pub sticky: bool,
}

impl PostSummary {
    pub fn from_frontmatter(post_id: &str, frontmatter: &Frontmatter) -> PostSummary {
        let slug = slug_from_id(post_id);
        let title = if frontmatter.title.trim().is_empty() {
            slug.clone()
        } else {
            frontmatter.title.clone()
        };

        PostSummary {
            id: post_id.to_string(),
            slug,
            title,
            date: frontmatter.date,
            updated: frontmatter.updated,
            categories: frontmatter.categories.flatten(),
            tags: dedup(frontmatter.tags.iter().cloned()),
            draft: frontmatter.draft,
            sticky: frontmatter.is_sticky(),
        }
    }

    pub fn last_modified(&self) -> PostDate {
        self.updated.unwrap_or(self.date)
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Default)]
pub enum Status {
    #[default]
    All,
    Draft,
    Published,
}

#[derive(Debug, Clone, Copy, PartialEq, Default)]
pub enum SortKey {
    #[default]
    Date,
    Updated,
    Title,
}

#[derive(Debug, Clone, Copy, PartialEq, Default)]
pub enum SortOrder {
    Asc,
    #[default]
    Desc,
}

#[derive(Debug, Clone, PartialEq, Default)]
pub struct ListQuery {
    pub category: Option<String>,
    pub tag: Option<String>,
    pub status: Status,
    pub search: Option<String>,
    pub sort: SortKey,
    pub order: SortOrder,
}

impl ListQuery {
    /// Unknown values fall back to the defaults rather than failing the listing.
    pub fn from_query(qs: &QueryString) -> ListQuery {
        let status = match qs.get("status") {
            Some("draft") => Status::Draft,
            Some("published") => Status::Published,
            _ => Status::All,
        };
        let sort = match qs.get("sort") {
            Some("updated") => SortKey::Updated,
            Some("title") => SortKey::Title,
            _ => SortKey::Date,
        };
        let order = match qs.get("order") {
            Some("asc") => SortOrder::Asc,
            _ => SortOrder::Desc,
        };

        ListQuery {
            category: qs.get("category").map(String::from),
            tag: qs.get("tag").map(String::from),
            status,
            search: qs.get("search").map(|s| s.to_lowercase()),
            sort,
            order,
        }
    }

    fn matches(&self, post: &PostSummary) -> bool {
        if let Some(ref category) = self.category {
            if !post.categories.contains(category) {
                return false;
            }
        }
        if let Some(ref tag) = self.tag {
            if !post.tags.contains(tag) {
                return false;
            }
        }
        match self.status {
            Status::Draft if !post.draft => return false,
            Status::Published if post.draft => return false,
            _ => {}
        }
        match self.search {
            Some(ref needle) => post.title.to_lowercase().contains(needle.as_str()),
            None => true,
        }
    }

    /// Sticky posts come first in either direction; the requested key orders
    /// each group.
    fn compare(&self, a: &PostSummary, b: &PostSummary) -> Ordering {
        let ordering = match self.sort {
            SortKey::Date => a.date.cmp(&b.date),
            SortKey::Updated => a.last_modified().cmp(&b.last_modified()),
            SortKey::Title => a.title.to_lowercase().cmp(&b.title.to_lowercase()),
        };
        let ordering = match self.order {
            SortOrder::Asc => ordering,
            SortOrder::Desc => ordering.reverse(),
        };
        b.sticky.cmp(&a.sticky).then(ordering)
    }
}

#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct NameCount {
    pub name: String,
    pub count: usize,
}

#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct Stats {
    pub total: usize,
    pub published: usize,
    pub draft: usize,
    pub categories: Vec<NameCount>,
    pub tags: Vec<NameCount>,
    pub recent_posts: Vec<PostSummary>,
}

#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct Listing {
    pub posts: Vec<PostSummary>,
    pub total: usize,
    pub stats: Stats,
    pub categories: Vec<String>,
    pub tags: Vec<String>,
}

// Sort by frequency reversed, then name
fn sorted_counts(count_map: HashMap<&str, usize>) -> Vec<NameCount> {
    let mut counts: Vec<NameCount> = count_map
        .into_iter()
        .map(|(name, count)| NameCount {
            name: name.to_string(),
            count,
        })
        .collect();
    counts.sort_by(|a, b| b.count.cmp(&a.count).then_with(|| a.name.cmp(&b.name)));
    counts
}

/// Stats always describe the whole corpus, whatever the query filters out.
pub fn compute_stats(posts: &[PostSummary]) -> Stats {
    let mut category_map = HashMap::new();
    let mut tag_map = HashMap::new();

    for post in posts {
        for category in post.categories.iter() {
            *category_map.entry(category.as_str()).or_insert(0) += 1;
        }
        for tag in post.tags.iter() {
            *tag_map.entry(tag.as_str()).or_insert(0) += 1;
        }
    }

    let draft = posts.iter().filter(|p| p.draft).count();

    let mut recent: Vec<&PostSummary> = posts.iter().collect();
    recent.sort_by(|a, b| b.last_modified().cmp(&a.last_modified()));
    let recent_posts = recent.into_iter().take(RECENT_POSTS).cloned().collect();

    Stats {
        total: posts.len(),
        published: posts.len() - draft,
        draft,
        categories: sorted_counts(category_map),
        tags: sorted_counts(tag_map),
        recent_posts,
    }
}

/// `posts` must be in enumeration order; ties in the requested sort keep it.
pub fn build_listing(posts: Vec<PostSummary>, query: &ListQuery) -> Listing {
    let stats = compute_stats(&posts);

    let categories: BTreeSet<&String> = posts.iter().flat_map(|p| p.categories.iter()).collect();
    let tags: BTreeSet<&String> = posts.iter().flat_map(|p| p.tags.iter()).collect();
    let categories = categories.into_iter().cloned().collect();
    let tags = tags.into_iter().cloned().collect();

    let mut filtered: Vec<PostSummary> = posts.into_iter().filter(|p| query.matches(p)).collect();
    filtered.sort_by(|a, b| query.compare(a, b));

    Listing {
        total: filtered.len(),
        posts: filtered,
        stats,
        categories,
        tags,
    }
}

#[cfg(test)]
mod tests {
    use std::collections::HashSet;

    use super::*;

    fn post(id: &str, title: &str, date: &str, draft: bool) -> PostSummary {
        PostSummary {
            id: id.to_string(),
            slug: slug_from_id(id),
            title: title.to_string(),
            date: PostDate::parse_strict(date).unwrap(),
            updated: None,
            categories: vec![],
            tags: vec![],
            draft,
            sticky: false,
        }
    }

    fn corpus() -> Vec<PostSummary> {
        let mut a = post("a.md", "Async Rust", "2026-01-10 10:00:00", false);
        a.categories = vec!["Tech".to_string()];
        a.tags = vec!["rust".to_string(), "async".to_string()];

        let mut b = post("b.md", "Baking bread", "2026-01-05 08:00:00", true);
        b.categories = vec!["Life".to_string()];
        b.updated = Some(PostDate::parse_strict("2026-02-01 00:00:00").unwrap());

        let mut c = post("c.md", "rust tips", "2026-01-10 10:00:00", false);
        c.categories = vec!["Tech".to_string(), "Life".to_string()];
        c.tags = vec!["rust".to_string()];

        let d = post("d.md", "Drafting", "2025-12-31 23:59:59", true);

        vec![a, b, c, d]
    }

    fn ids(listing: &Listing) -> Vec<&str> {
        listing.posts.iter().map(|p| p.id.as_str()).collect()
    }

    #[test]
    fn test_example_two_posts() {
        let posts = vec![
            post("first.md", "First", "2026-01-01 00:00:00", true),
            post("second.md", "Second", "2026-02-01 00:00:00", false),
        ];
        let query = ListQuery {
            status: Status::Published,
            ..Default::default()
        };
        let listing = build_listing(posts, &query);

        assert_eq!(listing.stats.total, 2);
        assert_eq!(listing.stats.published, 1);
        assert_eq!(listing.stats.draft, 1);
        assert_eq!(ids(&listing), ["second.md"]);
        assert_eq!(listing.total, 1);
    }

    #[test]
    fn test_no_filter_returns_everything_once() {
        let listing = build_listing(corpus(), &ListQuery::default());
        let mut all = ids(&listing);
        all.sort();
        assert_eq!(all, ["a.md", "b.md", "c.md", "d.md"]);
    }

    #[test]
    fn test_draft_and_published_partition() {
        let drafts = build_listing(corpus(), &ListQuery { status: Status::Draft, ..Default::default() });
        let published = build_listing(corpus(), &ListQuery { status: Status::Published, ..Default::default() });

        let drafts: HashSet<String> = drafts.posts.into_iter().map(|p| p.id).collect();
        let published: HashSet<String> = published.posts.into_iter().map(|p| p.id).collect();
        assert!(drafts.is_disjoint(&published));

        let union: HashSet<String> = drafts.union(&published).cloned().collect();
        let all: HashSet<String> = corpus().into_iter().map(|p| p.id).collect();
        assert_eq!(union, all);
    }

    #[test]
    fn test_stats_ignore_filters() {
        let query = ListQuery {
            category: Some("Tech".to_string()),
            search: Some("rust".to_string()),
            ..Default::default()
        };
        let listing = build_listing(corpus(), &query);

        assert_eq!(listing.total, 2);
        assert_eq!(listing.stats.total, 4);
        assert_eq!(listing.stats.total, listing.stats.published + listing.stats.draft);
        assert_eq!(listing.categories, ["Life", "Tech"]);
        assert_eq!(listing.tags, ["async", "rust"]);
        assert_eq!(
            listing.stats.categories,
            [
                NameCount { name: "Life".to_string(), count: 2 },
                NameCount { name: "Tech".to_string(), count: 2 },
            ]
        );
        assert_eq!(listing.stats.tags[0], NameCount { name: "rust".to_string(), count: 2 });
    }

    #[test]
    fn test_filters_are_conjunctive() {
        let query = ListQuery {
            category: Some("Life".to_string()),
            tag: Some("rust".to_string()),
            status: Status::Published,
            ..Default::default()
        };
        assert_eq!(ids(&build_listing(corpus(), &query)), ["c.md"]);

        let query = ListQuery {
            search: Some("BREAD".to_lowercase()),
            ..Default::default()
        };
        assert_eq!(ids(&build_listing(corpus(), &query)), ["b.md"]);
    }

    #[test]
    fn test_sort_ties_keep_enumeration_order() {
        // a and c share a date
        let desc = build_listing(corpus(), &ListQuery::default());
        assert_eq!(ids(&desc), ["a.md", "c.md", "b.md", "d.md"]);

        let asc = build_listing(corpus(), &ListQuery { order: SortOrder::Asc, ..Default::default() });
        assert_eq!(ids(&asc), ["d.md", "b.md", "a.md", "c.md"]);
    }

    #[test]
    fn test_sort_by_updated_and_title() {
        let by_updated = build_listing(corpus(), &ListQuery { sort: SortKey::Updated, ..Default::default() });
        assert_eq!(ids(&by_updated), ["b.md", "a.md", "c.md", "d.md"]);

        let by_title = build_listing(
            corpus(),
            &ListQuery { sort: SortKey::Title, order: SortOrder::Asc, ..Default::default() },
        );
        assert_eq!(ids(&by_title), ["a.md", "b.md", "d.md", "c.md"]);
    }

    #[test]
    fn test_sticky_posts_are_pinned() {
        let mut posts = corpus();
        posts[3].sticky = true;
        posts[2].sticky = true;

        let desc = build_listing(posts.clone(), &ListQuery::default());
        assert_eq!(ids(&desc), ["c.md", "d.md", "a.md", "b.md"]);

        let asc = build_listing(posts.clone(), &ListQuery { order: SortOrder::Asc, ..Default::default() });
        assert_eq!(ids(&asc), ["d.md", "c.md", "b.md", "a.md"]);

        let published = build_listing(posts, &ListQuery { status: Status::Published, ..Default::default() });
        assert_eq!(ids(&published), ["c.md", "a.md"]);
    }

    #[test]
    fn test_recent_posts_independent_of_sort() {
        let mut posts = corpus();
        for i in 0..6 {
            posts.push(post(&format!("old{}.md", i), "Old", &format!("2020-01-0{} 00:00:00", i + 1), false));
        }
        let listing = build_listing(posts, &ListQuery { sort: SortKey::Title, order: SortOrder::Asc, ..Default::default() });

        let recent: Vec<&str> = listing.stats.recent_posts.iter().map(|p| p.id.as_str()).collect();
        assert_eq!(recent, ["b.md", "a.md", "c.md", "d.md", "old5.md"]);
    }

    #[test]
    fn test_query_from_query_string() {
        let qs = QueryString::from("category=Tech&status=draft&search=RuSt&sort=title&order=asc&tag=");
        let query = ListQuery::from_query(&qs);
        assert_eq!(query.category.as_deref(), Some("Tech"));
        assert_eq!(query.tag, None);
        assert_eq!(query.status, Status::Draft);
        assert_eq!(query.search.as_deref(), Some("rust"));
        assert_eq!(query.sort, SortKey::Title);
        assert_eq!(query.order, SortOrder::Asc);

        assert_eq!(ListQuery::from_query(&QueryString::from("sort=bogus")), ListQuery::default());
    }
}
