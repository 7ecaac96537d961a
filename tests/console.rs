use runcast::broadcast::{LineOp, StreamEvent};
use runcast::console::render_event;
use runcast::output::{OutputFramer, OutputLog};
use runcast::registry::RunState;

fn output(op: LineOp, index: u64, data: &str) -> StreamEvent {
    StreamEvent::Output {
        op,
        index,
        data: data.to_string(),
    }
}

fn render_all(events: &[StreamEvent], erase_line: bool) -> String {
    let mut out = Vec::new();
    let mut open = false;
    for event in events {
        render_event(&mut out, &mut open, event, erase_line).unwrap();
    }
    String::from_utf8(out).unwrap()
}

fn progress_events() -> Vec<StreamEvent> {
    vec![
        output(LineOp::Append, 0, "fetching"),
        output(LineOp::Overwrite, 0, "fetching 50%"),
        output(LineOp::Overwrite, 0, "fetching 100%"),
        output(LineOp::Append, 1, "done"),
        StreamEvent::exit(&RunState::Exited { code: Some(0) }),
    ]
}

#[test]
fn test_terminal_rendering_erases_the_redrawn_row() {
    let text = render_all(&progress_events(), true);
    assert_eq!(
        text,
        "fetching\r\x1b[2Kfetching 50%\r\x1b[2Kfetching 100%\ndone\n"
    );
}

#[test]
fn test_captured_rendering_has_no_escape_sequences() {
    let text = render_all(&progress_events(), false);
    assert!(!text.contains('\x1b'));

    // A parent capturing this output frames it back into the same lines.
    let mut framer = OutputFramer::new();
    let mut log = OutputLog::new(100);
    for op in framer.push(&text) {
        log.apply(&op);
    }
    assert_eq!(log.texts(), vec!["fetching 100%", "done"]);
}
