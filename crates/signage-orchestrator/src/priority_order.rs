//! §4.7 step 6: order the required-files manifest so dependencies of
//! higher-priority layouts are fetched first (layout file before its
//! media), without requiring a full dependency graph solve.

use signage_model::{FileId, RequiredFileDescriptor};
use std::collections::HashMap;

/// `main_layouts` is the resolver's priority-ordered output; `dependencies_of`
/// maps a layout's `FileId` to the dependencies a prior parse discovered for
/// it (empty/absent if not yet known — those layouts simply contribute only
/// their own file to the ranking). Descriptors with no assigned rank keep
/// their relative order at the end (stable sort).
pub fn order_downloads(
    main_layouts: &[FileId],
    dependencies_of: &HashMap<FileId, Vec<FileId>>,
    mut descriptors: Vec<RequiredFileDescriptor>,
) -> Vec<RequiredFileDescriptor> {
    let mut rank: HashMap<FileId, usize> = HashMap::new();
    let mut next_rank = 0usize;
    let mut assign = |id: &FileId, rank: &mut HashMap<FileId, usize>, next_rank: &mut usize| {
        if !rank.contains_key(id) {
            rank.insert(id.clone(), *next_rank);
            *next_rank += 1;
        }
    };

    for layout in main_layouts {
        assign(layout, &mut rank, &mut next_rank);
        if let Some(deps) = dependencies_of.get(layout) {
            for dep in deps {
                assign(dep, &mut rank, &mut next_rank);
            }
        }
    }

    descriptors.sort_by_key(|d| rank.get(&d.file_id).copied().unwrap_or(usize::MAX));
    descriptors
}

#[cfg(test)]
mod tests {
    use super::*;
    use signage_model::FileSource;

    fn descriptor(id: u64, kind_layout: bool) -> RequiredFileDescriptor {
        RequiredFileDescriptor {
            file_id: if kind_layout { FileId::layout(id) } else { FileId::media(id) },
            md5: None,
            size: 0,
            source: FileSource::Http { url: format!("https://example.test/{id}") },
            priority_hint: None,
        }
    }

    #[test]
    fn higher_priority_layout_and_its_deps_sort_first() {
        let main_layouts = vec![FileId::layout(1), FileId::layout(2)];
        let mut deps = HashMap::new();
        deps.insert(FileId::layout(1), vec![FileId::media(10)]);
        deps.insert(FileId::layout(2), vec![FileId::media(20)]);

        let descriptors = vec![
            descriptor(20, false),
            descriptor(2, true),
            descriptor(10, false),
            descriptor(1, true),
            descriptor(999, false), // unrelated, stays last
        ];

        let ordered = order_downloads(&main_layouts, &deps, descriptors);
        let ids: Vec<u64> = ordered.iter().map(|d| d.file_id.id).collect();
        assert_eq!(ids, vec![1, 10, 2, 20, 999]);
    }
}
