use doc_model::{DocumentWriter, NodeKey};
use text_reconciler::{PointKind, ReconcileConfig, TextBuffer, TextRange, TextSession};

fn session_for_rich_document() -> (DocumentWriter, TextSession) {
    let mut writer = DocumentWriter::new();
    let heading = writer.append_element(NodeKey::ROOT, "# ", "\n").expect("heading");
    writer.append_text(heading, "Tïtle").expect("title");
    let list = writer.append_element(NodeKey::ROOT, "", "\n").expect("list");
    for word in ["first", "", "third"] {
        let item = writer.append_element(list, "- ", "\n").expect("item");
        writer.append_text(item, word).expect("item text");
    }
    writer.append_element(NodeKey::ROOT, "", "").expect("trailing empty");
    let quote = writer.append_element(NodeKey::ROOT, "", "").expect("quote");
    let bold = writer.append_element(quote, "<b>", "</b>").expect("bold");
    writer.append_text(bold, "x").expect("bold text");
    writer.append_text(quote, "tail").expect("quote text");
    let snapshot = writer.commit().next;

    let mut buffer = TextBuffer::new();
    let (session, _) =
        TextSession::attach(&snapshot, ReconcileConfig::default(), &mut buffer).expect("attach");
    (writer, session)
}

#[test]
fn every_anchored_offset_maps_back_to_itself() {
    let (writer, session) = session_for_rich_document();
    let snapshot = writer.snapshot();
    let length = snapshot.flat_text().chars().count();

    let mut anchored = 0;
    for offset in 0..=length {
        let Some(point) = session
            .map_offset_to_point(snapshot, offset)
            .expect("map offset")
        else {
            continue;
        };
        anchored += 1;
        assert_eq!(
            session.map_point_to_offset(snapshot, point),
            Ok(offset),
            "offset {offset} -> {point:?}"
        );
    }
    assert!(anchored > length / 2, "only {anchored} of {length} offsets anchored");
}

#[test]
fn offsets_inside_markup_do_not_anchor() {
    let (writer, session) = session_for_rich_document();
    let snapshot = writer.snapshot();
    // "# Tïtle\n": offset 1 sits between '#' and ' '.
    assert_eq!(session.map_offset_to_point(snapshot, 1), Ok(None));
}

#[test]
fn native_ranges_round_trip() {
    let (writer, session) = session_for_rich_document();
    let snapshot = writer.snapshot();
    let length = snapshot.flat_text().chars().count();

    for location in 0..=length {
        for len in [0, 1, 3] {
            let range = TextRange::new(location, len);
            if range.end() > length {
                continue;
            }
            let Some(selection) = session
                .selection_from_native_range(snapshot, range)
                .expect("map range")
            else {
                continue;
            };
            assert_eq!(
                session.map_selection_to_range(snapshot, &selection),
                Ok(range),
                "range {range:?} -> {selection:?}"
            );
        }
    }
}

#[test]
fn text_points_use_char_offsets() {
    let (writer, session) = session_for_rich_document();
    let snapshot = writer.snapshot();
    // "# T" then 'ï' at 3.
    let point = session
        .map_offset_to_point(snapshot, 4)
        .expect("map")
        .expect("anchored");
    assert_eq!(point.kind, PointKind::Text);
    assert_eq!(point.offset, 2);
}
