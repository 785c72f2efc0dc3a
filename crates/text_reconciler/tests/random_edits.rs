use doc_model::{DocumentWriter, NodeKey, Snapshot};
use text_reconciler::{ReconcileConfig, TextBuffer, TextSession, reconcile_from_empty};

/// Deterministic xorshift64; enough spread for picking nodes and operations.
struct XorShift(u64);

impl XorShift {
    fn next(&mut self) -> u64 {
        let mut x = self.0;
        x ^= x << 13;
        x ^= x >> 7;
        x ^= x << 17;
        self.0 = x;
        x
    }

    fn below(&mut self, bound: usize) -> usize {
        (self.next() % bound.max(1) as u64) as usize
    }

    fn pick<T: Copy>(&mut self, items: &[T]) -> Option<T> {
        if items.is_empty() {
            None
        } else {
            Some(items[self.below(items.len())])
        }
    }
}

const WORDS: &[&str] = &["", "a", "héllo", "wörld", "é", "longer text", "\n", "ß∂"];
const MARKUP: &[&str] = &["", "- ", "> ", "\n", "<b>", "</b>", "# "];

fn elements(snapshot: &Snapshot) -> Vec<NodeKey> {
    snapshot
        .document_order()
        .into_iter()
        .filter(|key| snapshot.get(*key).is_some_and(|node| node.is_element()))
        .collect()
}

fn texts(snapshot: &Snapshot) -> Vec<NodeKey> {
    snapshot
        .document_order()
        .into_iter()
        .filter(|key| snapshot.get(*key).is_some_and(|node| node.is_text()))
        .collect()
}

fn non_root(snapshot: &Snapshot) -> Vec<NodeKey> {
    snapshot
        .document_order()
        .into_iter()
        .filter(|key| *key != snapshot.root())
        .collect()
}

fn non_root_elements(snapshot: &Snapshot) -> Vec<NodeKey> {
    elements(snapshot)
        .into_iter()
        .filter(|key| *key != snapshot.root())
        .collect()
}

/// Applies one to three random mutations; invalid ones (cycles, bad
/// indices) are rejected by the writer and skipped.
fn mutate(writer: &mut DocumentWriter, rng: &mut XorShift) {
    for _ in 0..=rng.below(3) {
        let current = writer.working_snapshot();
        let word = WORDS[rng.below(WORDS.len())];
        let markup = MARKUP[rng.below(MARKUP.len())];
        let _ = match rng.below(8) {
            0 | 1 => match rng.pick(&texts(&current)) {
                Some(key) => writer.set_text(key, word),
                None => Ok(()),
            },
            2 => match rng.pick(&elements(&current)) {
                Some(parent) => writer.append_text(parent, word).map(|_| ()),
                None => Ok(()),
            },
            3 => match rng.pick(&elements(&current)) {
                Some(parent) => {
                    let len = current.children_of(parent).map_or(0, <[NodeKey]>::len);
                    writer
                        .insert_element(parent, rng.below(len + 1), markup, MARKUP[rng.below(MARKUP.len())])
                        .map(|_| ())
                }
                None => Ok(()),
            },
            4 => match rng.pick(&non_root(&current)) {
                Some(key) => writer.remove(key),
                None => Ok(()),
            },
            5 | 6 => match (rng.pick(&non_root(&current)), rng.pick(&elements(&current))) {
                (Some(key), Some(parent)) => {
                    let len = current.children_of(parent).map_or(0, <[NodeKey]>::len);
                    writer.move_node(key, parent, rng.below(len))
                }
                _ => Ok(()),
            },
            _ => match rng.pick(&non_root_elements(&current)) {
                Some(key) => writer.set_prefix(key, markup),
                None => Ok(()),
            },
        };
    }
}

#[test]
fn random_passes_keep_surface_and_cache_in_sync() {
    let config = ReconcileConfig {
        verify_lengths: true,
        ..ReconcileConfig::default()
    };
    for seed in [0x9E37_79B9_7F4A_7C15_u64, 0xDEAD_BEEF, 42] {
        let mut rng = XorShift(seed);
        let mut writer = DocumentWriter::new();
        let p = writer.append_element(NodeKey::ROOT, "", "\n").expect("paragraph");
        writer.append_text(p, "seed").expect("text");
        let attached = writer.commit().next;

        let mut buffer = TextBuffer::new();
        let (mut session, _) =
            TextSession::attach(&attached, config.clone(), &mut buffer).expect("attach");

        for pass in 0..300 {
            mutate(&mut writer, &mut rng);
            let transition = writer.commit();
            session
                .update(&transition, &mut buffer)
                .unwrap_or_else(|err| panic!("seed {seed:#x} pass {pass}: {err}"));

            assert_eq!(
                buffer.text(),
                transition.next.flat_text(),
                "seed {seed:#x} pass {pass}: surface diverged"
            );
            assert!(buffer.errors().is_empty(), "seed {seed:#x} pass {pass}: {:?}", buffer.errors());

            let rebuilt = reconcile_from_empty(&transition.next, &config)
                .expect("rebuild")
                .cache;
            assert_eq!(
                session.cache(),
                &rebuilt,
                "seed {seed:#x} pass {pass}: incremental cache differs from a full rebuild"
            );
        }
    }
}
