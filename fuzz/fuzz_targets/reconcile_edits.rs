#![no_main]

use doc_model::{DocumentWriter, NodeKey, Snapshot};
use libfuzzer_sys::fuzz_target;
use text_reconciler::{ReconcileConfig, TextBuffer, TextSession};

const PIECES: &[&str] = &["", "a", "é", "\n", "- ", "<b>", "longer"];

fn pick(keys: &[NodeKey], byte: u8) -> Option<NodeKey> {
    if keys.is_empty() {
        None
    } else {
        Some(keys[byte as usize % keys.len()])
    }
}

fn keys_where(snapshot: &Snapshot, text: bool) -> Vec<NodeKey> {
    snapshot
        .document_order()
        .into_iter()
        .filter(|key| snapshot.get(*key).is_some_and(|node| node.is_text() == text))
        .collect()
}

// Every 4 bytes are one edit: opcode, two node selectors, one payload
// selector. A zero opcode commits and runs a pass.
fuzz_target!(|data: &[u8]| {
    let config = ReconcileConfig {
        verify_lengths: true,
        ..ReconcileConfig::default()
    };
    let mut writer = DocumentWriter::new();
    let mut buffer = TextBuffer::new();
    let Ok((mut session, _)) = TextSession::attach(writer.snapshot(), config, &mut buffer) else {
        return;
    };

    for chunk in data.chunks(4).chain(std::iter::once(&[0u8][..])) {
        let [op, a, b, c] = [0, 1, 2, 3].map(|i| chunk.get(i).copied().unwrap_or(0));
        let current = writer.working_snapshot();
        let elements = keys_where(&current, false);
        let texts = keys_where(&current, true);
        let piece = PIECES[c as usize % PIECES.len()];
        let _ = match op % 7 {
            0 => {
                let transition = writer.commit();
                session
                    .update(&transition, &mut buffer)
                    .expect("pass over a well-formed document");
                assert_eq!(buffer.text(), transition.next.flat_text());
                assert!(buffer.errors().is_empty());
                Ok(())
            }
            1 => pick(&texts, a).map_or(Ok(()), |key| writer.set_text(key, piece)),
            2 => pick(&elements, a).map_or(Ok(()), |parent| writer.append_text(parent, piece).map(|_| ())),
            3 => pick(&elements, a).map_or(Ok(()), |parent| {
                writer.append_element(parent, piece, PIECES[b as usize % PIECES.len()]).map(|_| ())
            }),
            4 => pick(&elements, a).map_or(Ok(()), |key| writer.set_suffix(key, piece)),
            5 => {
                let all = current.document_order();
                pick(&all, a).map_or(Ok(()), |key| writer.remove(key))
            }
            _ => {
                let all = current.document_order();
                match (pick(&all, a), pick(&elements, b)) {
                    (Some(key), Some(parent)) => writer.move_node(key, parent, c as usize % 3),
                    _ => Ok(()),
                }
            }
        };
    }
});
