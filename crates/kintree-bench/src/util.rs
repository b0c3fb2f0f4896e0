use kintree_core::{FamilyTree, Member};
use kintree_store::MemberStore;
use std::path::PathBuf;
use tempfile::TempDir;

/// A tree where every member after the first `founders` has one or two
/// parents picked from earlier members, so generations keep growing.
pub fn synthetic_family(member_count: usize, founders: usize) -> Vec<Member> {
    let founders = founders.max(1);
    (0..member_count)
        .map(|i| {
            let member = Member::named(format!("m{i}"), "First", &format!("Last{}", i % 7));
            if i < founders {
                return member;
            }
            let p1 = format!("m{}", (i * 7 + 3) % i);
            let p2 = (i % 3 != 0).then(|| format!("m{}", (i * 13 + 5) % i));
            member.with_parents(Some(p1.as_str()), p2.as_deref())
        })
        .collect()
}

/// Writes a synthetic tree document and returns its location.
pub fn write_synthetic_document(member_count: usize) -> anyhow::Result<(TempDir, PathBuf)> {
    let dir = tempfile::tempdir()?;
    let path = dir.path().join("tree.json");
    let mut store = MemberStore::new(FamilyTree::new("bench", "Synthetic", "bench"));
    for member in synthetic_family(member_count, 10) {
        store.insert_member(member)?;
    }
    store.save(&path)?;
    Ok((dir, path))
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_synthetic_family_only_references_earlier_members() {
        let members = synthetic_family(200, 10);
        assert_eq!(members.len(), 200);
        for (i, member) in members.iter().enumerate() {
            for parent in member.parent_refs().into_iter().flatten() {
                let index: usize = parent.as_str()[1..].parse().unwrap();
                assert!(index < i);
            }
        }
        assert!(members[..10].iter().all(|m| m.parent_id1.is_none()));
    }
}
