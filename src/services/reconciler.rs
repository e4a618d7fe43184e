use crate::models::CategoryPlaylist;
use crate::services::index::CategoryIndex;

/// The index turned into output order
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct Reconciled {
    /// Categories in first-seen order, URLs sorted
    pub categories: Vec<CategoryPlaylist>,
    /// Union of every category, each URL once, sorted
    pub merged: Vec<String>,
    /// Declared categories that ended up with no URLs
    pub skipped: Vec<String>,
}

fn sorted<I: IntoIterator<Item = String>>(urls: I) -> Vec<String> {
    let mut urls: Vec<String> = urls.into_iter().collect();
    urls.sort_unstable();
    urls
}

/// Compute per-category playlists and the merged union from a finished index.
/// `declared` are categories the catalog expects; any that collected nothing are
/// reported as skipped.
pub fn reconcile(index: &CategoryIndex, declared: &[String]) -> Reconciled {
    let mut reconciled = Reconciled::default();

    for name in index.categories() {
        let urls = index.urls(&name).unwrap_or_default();
        reconciled.categories.push(CategoryPlaylist {
            name,
            urls: sorted(urls),
        });
    }

    for name in declared {
        let present = reconciled.categories.iter().any(|c| &c.name == name);
        if !present && !reconciled.skipped.contains(name) {
            reconciled.skipped.push(name.clone());
        }
    }

    reconciled.merged = sorted(index.union());
    reconciled
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_merged_is_a_set_union() {
        let index = CategoryIndex::new();
        for category in ["News", "Sports", "General"] {
            index.add(category, "http://shared/1");
        }
        index.add("Sports", "http://b/2");

        let reconciled = reconcile(&index, &[]);

        assert_eq!(reconciled.merged, vec!["http://b/2", "http://shared/1"]);
        assert_eq!(reconciled.categories.len(), 3);
    }

    #[test]
    fn test_categories_sorted_for_output() {
        let index = CategoryIndex::new();
        index.add("News", "http://z/9");
        index.add("News", "http://a/1");
        index.add("Movies", "http://m/1");

        let reconciled = reconcile(&index, &[]);

        assert_eq!(
            reconciled.categories,
            vec![
                CategoryPlaylist {
                    name: "News".to_string(),
                    urls: vec!["http://a/1".to_string(), "http://z/9".to_string()],
                },
                CategoryPlaylist {
                    name: "Movies".to_string(),
                    urls: vec!["http://m/1".to_string()],
                },
            ]
        );
        assert!(reconciled.skipped.is_empty());
    }

    #[test]
    fn test_declared_categories_without_urls_are_skipped() {
        let index = CategoryIndex::new();
        index.add("News", "http://a/1");
        let declared = vec!["News".to_string(), "Movies".to_string(), "Movies".to_string()];

        let reconciled = reconcile(&index, &declared);

        assert_eq!(reconciled.skipped, vec!["Movies"]);
        assert_eq!(reconciled.categories.len(), 1);
    }

    #[test]
    fn test_reconcile_empty_index() {
        let reconciled = reconcile(&CategoryIndex::new(), &["General".to_string()]);
        assert!(reconciled.categories.is_empty());
        assert!(reconciled.merged.is_empty());
        assert_eq!(reconciled.skipped, vec!["General"]);
    }
}
