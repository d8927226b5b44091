//! Filename strategy for containers whose metadata does not declare a cover.

use crate::archive::ArchiveEntry;
use crate::resolve::has_image_extension;

/// First image whose path mentions "cover" (case-insensitive), otherwise the
/// largest image by uncompressed size. Ties go to the earliest entry.
pub fn cover_from_entries(entries: &[ArchiveEntry]) -> Option<String> {
    let mut largest: Option<&ArchiveEntry> = None;

    for entry in entries.iter().filter(|e| has_image_extension(&e.name)) {
        if entry.name.to_lowercase().contains("cover") {
            return Some(entry.name.clone());
        }
        if largest.map_or(true, |best| entry.size > best.size) {
            largest = Some(entry);
        }
    }

    if let Some(entry) = largest {
        tracing::debug!("No cover-named image, using largest: {} ({} bytes)", entry.name, entry.size);
    }
    largest.map(|e| e.name.clone())
}

#[cfg(test)]
mod tests {
    use super::*;
    use pretty_assertions::assert_eq;

    fn entries(list: &[(&str, u64)]) -> Vec<ArchiveEntry> {
        list.iter()
            .map(|(name, size)| ArchiveEntry {
                name: name.to_string(),
                size: *size,
            })
            .collect()
    }

    #[test]
    fn test_cover_name_case_insensitive() {
        let list = entries(&[
            ("mimetype", 20),
            ("OEBPS/img/huge.jpg", 900_000),
            ("OEBPS/img/book-cover.PNG", 1_000),
        ]);
        assert_eq!(cover_from_entries(&list).as_deref(), Some("OEBPS/img/book-cover.PNG"));
    }

    #[test]
    fn test_first_cover_name_in_listing_order() {
        let list = entries(&[("Cover2.jpg", 10), ("cover1.jpg", 99)]);
        assert_eq!(cover_from_entries(&list).as_deref(), Some("Cover2.jpg"));
    }

    #[test]
    fn test_cover_directory_counts() {
        let list = entries(&[("a.png", 500), ("COVERS/front.jpeg", 1)]);
        assert_eq!(cover_from_entries(&list).as_deref(), Some("COVERS/front.jpeg"));
    }

    #[test]
    fn test_cover_name_needs_image_extension() {
        let list = entries(&[("cover.xhtml", 4_000), ("cover.gif", 4_000), ("plate.jpg", 12)]);
        assert_eq!(cover_from_entries(&list).as_deref(), Some("plate.jpg"));
    }

    #[test]
    fn test_largest_image_fallback() {
        let list = entries(&[("a.jpg", 10 * 1024), ("b.png", 50 * 1024), ("style.css", 90 * 1024)]);
        assert_eq!(cover_from_entries(&list).as_deref(), Some("b.png"));
    }

    #[test]
    fn test_largest_tie_goes_to_first() {
        let list = entries(&[("x.jpg", 10), ("y.png", 40), ("z.jpeg", 40)]);
        assert_eq!(cover_from_entries(&list).as_deref(), Some("y.png"));
    }

    #[test]
    fn test_no_images() {
        let list = entries(&[("mimetype", 20), ("OEBPS/ch1.xhtml", 3_000)]);
        assert_eq!(cover_from_entries(&list), None);
        assert_eq!(cover_from_entries(&[]), None);
    }
}
