use crossterm::event::{KeyCode, KeyEvent, KeyModifiers};
use pretty_assertions::assert_eq;
use serde_json::json;

use super::*;
use crate::document::ResolvedPos;

fn step(title: &str, body: &str) -> Node {
    let title = if title.is_empty() {
        Vec::new()
    } else {
        vec![Node::text(title)]
    };
    let body = if body.is_empty() {
        Vec::new()
    } else {
        vec![Node::text(body)]
    };
    Node::step_item(
        Node::step_title(title),
        Node::step_content(vec![Node::paragraph(body)]),
    )
}

fn paragraph(text: &str) -> Node {
    Node::paragraph(vec![Node::text(text)])
}

fn editor_at(blocks: Vec<Node>, cursor: usize) -> DocumentEditor {
    let mut editor = DocumentEditor::new(Node::doc(blocks));
    editor.move_to(cursor);
    assert_eq!(editor.selection(), Selection::cursor(cursor));
    editor
}

fn kinds(doc: &Node) -> Vec<NodeType> {
    doc.content().iter().map(Node::kind).collect()
}

fn titles(doc: &Node) -> Vec<String> {
    doc.find_all(NodeType::StepTitle)
        .into_iter()
        .map(|(_, title)| title.text_content())
        .collect()
}

fn assert_step_structure(doc: &Node) {
    assert!(doc.check().is_ok(), "schema violation in {doc:?}");
    for (_, steps) in doc.find_all(NodeType::Steps) {
        assert!(steps.child_count() >= 1);
    }
    for (_, item) in doc.find_all(NodeType::StepItem) {
        let children = item.content().iter().map(Node::kind).collect::<Vec<_>>();
        assert_eq!(children, vec![NodeType::StepTitle, NodeType::StepContent]);
    }
}

#[test]
fn toggle_on_empty_document_creates_one_empty_step() {
    let mut editor = DocumentEditor::default();
    assert!(editor.toggle_steps());

    let doc = editor.document();
    assert_step_structure(doc);
    assert_eq!(kinds(doc), vec![NodeType::Steps]);
    assert_eq!(doc.find_all(NodeType::StepItem).len(), 1);
    assert_eq!(titles(doc), vec![String::new()]);
    let (_, content) = doc.find_all(NodeType::StepContent)[0];
    assert_eq!(content.content(), &[Node::paragraph(Vec::new())]);
    assert_eq!(editor.selection(), Selection::cursor(3));
}

#[test]
fn toggle_on_selected_paragraph_makes_it_the_title() {
    let mut editor = DocumentEditor::new(Node::doc(vec![paragraph("Hello")]));
    editor.set_selection(Selection::range(1, 6));
    assert!(editor.toggle_steps());

    let doc = editor.document();
    assert_step_structure(doc);
    assert_eq!(titles(doc), vec!["Hello".to_string()]);
    let (_, content) = doc.find_all(NodeType::StepContent)[0];
    assert_eq!(content.content(), &[Node::paragraph(Vec::new())]);
    assert_eq!(editor.selection(), Selection::cursor(3));
}

#[test]
fn enter_at_title_end_moves_into_content() {
    let mut editor = editor_at(vec![Node::steps(vec![step("Step One", "")])], 11);
    assert!(editor.handle_enter());

    assert_eq!(titles(editor.document()), vec!["Step One".to_string()]);
    assert_eq!(editor.selection(), Selection::cursor(14));
    let resolved = ResolvedPos::resolve(editor.document(), 14).unwrap();
    assert!(resolved.parent().is(NodeType::Paragraph));
    assert!(resolved.node(resolved.depth() - 1).is(NodeType::StepContent));
}

#[test]
fn enter_inside_title_moves_the_rest_into_content() {
    let mut editor = editor_at(vec![Node::steps(vec![step("Step Title", "Existing")])], 8);
    assert!(editor.handle_enter());

    let doc = editor.document();
    assert_step_structure(doc);
    assert_eq!(titles(doc), vec!["Step ".to_string()]);
    let (_, content) = doc.find_all(NodeType::StepContent)[0];
    assert_eq!(content.text_content(), "TitleExisting");
    assert_eq!(editor.selection(), Selection::cursor(11));
}

#[test]
fn backspace_at_second_title_removes_that_step() {
    let mut editor = editor_at(vec![Node::steps(vec![step("One", "A"), step("Two", "B")])], 15);
    assert!(editor.handle_backspace());

    let doc = editor.document();
    assert_step_structure(doc);
    assert_eq!(doc.find_all(NodeType::StepItem).len(), 1);
    assert_eq!(
        kinds(doc),
        vec![NodeType::Steps, NodeType::Heading, NodeType::Paragraph]
    );
    assert_eq!(doc.text_content(), "OneATwoB");
    assert_eq!(editor.selection(), Selection::cursor(15));
}

#[test]
fn toggle_off_middle_step_splits_the_list_around_its_prose() {
    let mut editor = DocumentEditor::new(Node::doc(vec![Node::steps(vec![
        step("T1", "c1"),
        step("T2", "c2"),
        step("T3", "c3"),
    ])]));
    editor.set_selection(Selection::range(15, 22));
    assert!(editor.toggle_steps());

    let doc = editor.document();
    assert_step_structure(doc);
    assert_eq!(doc.find_all(NodeType::StepItem).len(), 2);
    assert_eq!(
        kinds(doc),
        vec![
            NodeType::Steps,
            NodeType::Heading,
            NodeType::Paragraph,
            NodeType::Steps
        ]
    );
    assert_eq!(doc.child(1).map(Node::text_content), Some("T2".to_string()));
    assert_eq!(doc.child(1).and_then(Node::heading_level), Some(2));
    assert_eq!(doc.child(2).map(Node::text_content), Some("c2".to_string()));
    assert_eq!(titles(doc), vec!["T1".to_string(), "T3".to_string()]);
}

#[test]
fn removing_the_only_empty_step_leaves_one_empty_paragraph() {
    let mut editor = DocumentEditor::default();
    assert!(editor.toggle_steps());
    assert!(editor.remove_step());

    let doc = editor.document();
    assert_eq!(doc.content(), &[Node::paragraph(Vec::new())]);
    assert_eq!(editor.selection(), Selection::cursor(1));
}

#[test]
fn backspace_in_the_only_empty_title_dissolves_the_list() {
    let mut editor = DocumentEditor::default();
    assert!(editor.toggle_steps());
    assert!(editor.handle_backspace());
    assert_eq!(editor.document().content(), &[Node::paragraph(Vec::new())]);
}

#[test]
fn remove_step_keeps_title_and_content_text_in_order() {
    let mut editor = editor_at(vec![Node::steps(vec![step("Knead", "Ten minutes")])], 5);
    assert!(editor.remove_step());

    let doc = editor.document();
    assert_eq!(kinds(doc), vec![NodeType::Heading, NodeType::Paragraph]);
    assert_eq!(doc.text_content(), "KneadTen minutes");
    assert!(doc.find_all(NodeType::Steps).is_empty());
}

#[test]
fn remove_first_step_puts_prose_before_the_list() {
    let mut editor = editor_at(vec![Node::steps(vec![step("One", "A"), step("Two", "B")])], 4);
    assert!(editor.remove_step());

    let doc = editor.document();
    assert_eq!(
        kinds(doc),
        vec![NodeType::Heading, NodeType::Paragraph, NodeType::Steps]
    );
    assert_eq!(titles(doc), vec!["Two".to_string()]);
    assert_eq!(editor.selection(), Selection::cursor(1));
}

#[test]
fn remove_untitled_empty_middle_step_keeps_one_list() {
    // Middle step: empty title at 13, empty body paragraph at 16.
    for cursor in [13, 16] {
        let mut editor = editor_at(
            vec![Node::steps(vec![step("A", "a"), step("", ""), step("C", "c")])],
            cursor,
        );
        assert!(editor.remove_step());

        let doc = editor.document();
        assert_step_structure(doc);
        assert_eq!(kinds(doc), vec![NodeType::Steps]);
        assert_eq!(titles(doc), vec!["A".to_string(), "C".to_string()]);
        assert_eq!(doc.text_content(), "AaCc");
        // End of A's body.
        assert_eq!(editor.selection(), Selection::cursor(8));
    }
}

#[test]
fn toggle_twice_restores_the_text() {
    let mut editor = DocumentEditor::new(Node::doc(vec![paragraph("Hello")]));
    editor.set_selection(Selection::range(1, 6));
    assert!(editor.toggle_steps());

    editor.set_selection(Selection::range(3, 11));
    assert!(editor.toggle_steps());

    let doc = editor.document();
    assert!(doc.find_all(NodeType::Steps).is_empty());
    assert_eq!(doc.text_content(), "Hello");
    assert_eq!(kinds(doc), vec![NodeType::Heading]);
}

#[test]
fn toggle_on_several_blocks_uses_the_first_as_title() {
    let mut editor = DocumentEditor::new(Node::doc(vec![
        paragraph("Title"),
        paragraph("Body one"),
        paragraph("Body two"),
    ]));
    editor.set_selection(Selection::range(1, 25));
    assert!(editor.toggle_steps());

    let doc = editor.document();
    assert_step_structure(doc);
    assert_eq!(titles(doc), vec!["Title".to_string()]);
    let (_, content) = doc.find_all(NodeType::StepContent)[0];
    assert_eq!(content.child_count(), 2);
    assert_eq!(content.text_content(), "Body oneBody two");
}

#[test]
fn typed_title_and_content_become_prose_again() {
    let mut editor = DocumentEditor::default();
    assert!(editor.toggle_steps());
    assert!(editor.insert_text("Title"));
    assert!(editor.handle_enter());
    assert_eq!(editor.selection(), Selection::cursor(11));
    assert!(editor.insert_text("Content"));
    assert!(editor.unset_steps());

    let doc = editor.document();
    assert_eq!(kinds(doc), vec![NodeType::Heading, NodeType::Paragraph]);
    assert_eq!(doc.child(0).map(Node::text_content), Some("Title".to_string()));
    assert_eq!(doc.child(1).map(Node::text_content), Some("Content".to_string()));
}

#[test]
fn insert_step_after_and_before_the_current_one() {
    let mut editor = DocumentEditor::new(Node::doc(vec![paragraph("Hello")]));
    editor.set_selection(Selection::range(1, 6));
    assert!(editor.toggle_steps());

    assert!(editor.insert_step(InsertStepOptions::default().with_title("After")));
    assert_eq!(titles(editor.document()), vec!["Hello".to_string(), "After".to_string()]);
    assert_eq!(editor.selection(), Selection::cursor(16));

    assert!(editor.insert_step(InsertStepOptions::before()));
    assert_eq!(
        titles(editor.document()),
        vec!["Hello".to_string(), String::new(), "After".to_string()]
    );
    assert_eq!(editor.selection(), Selection::cursor(16));
    assert_step_structure(editor.document());
    assert_eq!(editor.document().find_all(NodeType::Steps).len(), 1);
}

#[test]
fn insert_step_with_content_blocks() {
    let mut editor = editor_at(vec![paragraph("Intro")], 2);
    let options = InsertStepOptions::default()
        .with_title("Bake")
        .with_content(vec![paragraph("At 200 degrees")]);
    assert!(editor.insert_step(options));

    let doc = editor.document();
    assert_step_structure(doc);
    assert_eq!(kinds(doc), vec![NodeType::Steps, NodeType::Paragraph]);
    assert_eq!(doc.text_content(), "BakeAt 200 degreesIntro");
    assert_eq!(editor.selection(), Selection::cursor(3));
}

#[test]
fn insert_step_below_a_list_joins_it() {
    let mut editor = editor_at(vec![Node::steps(vec![step("A", "a")]), paragraph("x")], 13);
    assert!(editor.insert_step(InsertStepOptions::default()));

    let doc = editor.document();
    assert_step_structure(doc);
    assert_eq!(kinds(doc), vec![NodeType::Steps, NodeType::Paragraph]);
    assert_eq!(titles(doc), vec!["A".to_string(), String::new()]);
    assert_eq!(editor.selection(), Selection::cursor(13));
}

#[test]
fn dry_runs_do_not_change_anything() {
    let editor = DocumentEditor::new(Node::doc(vec![paragraph("Hello")]));
    let before = editor.document().clone();
    let selection = editor.selection();

    assert!(editor.can_toggle_steps());
    assert!(editor.can_set_steps());
    assert!(editor.can_insert_step(&InsertStepOptions::default()));
    assert!(!editor.can_unset_steps());
    assert!(!editor.can_remove_step());

    assert_eq!(editor.document(), &before);
    assert_eq!(editor.selection(), selection);
}

#[test]
fn declined_commands_leave_the_state_alone() {
    let mut editor = editor_at(vec![paragraph("Hello")], 3);
    let before = editor.document().clone();

    assert!(!editor.unset_steps());
    assert!(!editor.remove_step());
    assert!(!editor.handle_enter());
    assert!(!editor.handle_backspace());
    assert_eq!(editor.document(), &before);
    assert_eq!(editor.selection(), Selection::cursor(3));

    assert!(editor.set_steps());
    let stepped = editor.document().clone();
    assert!(!editor.set_steps());
    assert_eq!(editor.document(), &stepped);
}

#[test]
fn toggle_shortcut_runs_through_key_events() {
    let mut editor = editor_at(vec![paragraph("Hello")], 3);
    let chord = KeyEvent::new(KeyCode::Char('s'), KeyModifiers::CONTROL | KeyModifiers::ALT);
    assert!(editor.handle_key_event(&chord));
    assert_eq!(titles(editor.document()), vec!["Hello".to_string()]);

    let plain = KeyEvent::new(KeyCode::Char('s'), KeyModifiers::NONE);
    assert!(!editor.handle_key_event(&plain));
}

#[test]
fn html_output_uses_configured_attributes() {
    let mut options = StepsOptions::default();
    options.html_attributes.insert(
        "steps".to_string(),
        [("class".to_string(), "guide".to_string())].into_iter().collect(),
    );
    let editor = DocumentEditor::with_options(
        Node::doc(vec![Node::steps(vec![step("Mix", "Stir")])]),
        options,
    );
    assert_eq!(
        editor.to_html(),
        "<ol class=\"guide\" data-type=\"steps\"><li data-type=\"step-item\">\
         <div data-type=\"step-title\">Mix</div>\
         <div data-type=\"step-content\"><p>Stir</p></div></li></ol>"
    );
}

#[test]
fn editor_from_json_value() {
    let editor = DocumentEditor::try_from(json!({
        "type": "doc",
        "content": [{"type": "paragraph", "content": [{"type": "text", "text": "Hi"}]}]
    }))
    .unwrap();
    assert_eq!(editor.document().text_content(), "Hi");
    assert_eq!(editor.to_json()["content"][0]["type"], "paragraph");

    assert!(DocumentEditor::try_from(json!({"type": "nope"})).is_err());
}

#[test]
fn every_command_sequence_keeps_the_structure_valid() {
    let mut editor = DocumentEditor::new(Node::doc(vec![paragraph("One"), paragraph("Two")]));
    editor.select_all();
    assert!(editor.toggle_steps());
    assert_step_structure(editor.document());

    assert!(editor.insert_step(InsertStepOptions::default().with_title("Next")));
    assert_step_structure(editor.document());

    assert!(editor.handle_enter());
    assert_step_structure(editor.document());

    editor.focus_end();
    assert!(editor.handle_enter());
    assert_step_structure(editor.document());

    editor.select_all();
    assert!(editor.toggle_steps());
    assert_step_structure(editor.document());
    assert!(editor.document().find_all(NodeType::Steps).is_empty());
    assert_eq!(editor.document().text_content(), "OneTwoNext");
}

#[test]
fn ancestors_and_bounds() {
    // p("ab") 0..4, steps 4..18, item 5..17, title 6..11, content 11..16
    let doc = Node::doc(vec![
        paragraph("ab"),
        Node::steps(vec![step("One", "x")]),
    ]);

    let item = find_ancestor_of_type(&doc, Selection::cursor(8), NodeType::StepItem).unwrap();
    assert_eq!(
        bounds_of(&item),
        Bounds {
            start: 5,
            end: 17,
            content_start: 6,
            content_end: 16,
        }
    );
    let steps = find_ancestor_of_type(&doc, Selection::range(13, 8), NodeType::Steps).unwrap();
    assert_eq!((steps.pos, steps.end()), (4, 18));

    assert!(find_ancestor_of_type(&doc, Selection::cursor(2), NodeType::StepItem).is_none());
    assert!(find_ancestor_at(&doc, 100, NodeType::Steps).is_none());
}
