/*!
 * Tests for SSE framing and event decoding
 */

use resumeflow::protocol::{SseFrame, SseParser, Stage, StreamEvent};

fn parse_all(chunks: &[&[u8]]) -> Vec<SseFrame> {
    let mut parser = SseParser::new();
    let mut frames = Vec::new();
    for chunk in chunks {
        frames.extend(parser.feed(chunk));
    }
    frames.extend(parser.finish());
    frames
}

#[test]
fn test_parser_withCrlfAndComments_shouldProduceFrames() {
    let frames = parse_all(&[b": keep-alive\r\nevent: category\r\ndata: {\"text\":\"it\"}\r\n\r\n"]);
    assert_eq!(frames, vec![SseFrame::named("category", "{\"text\":\"it\"}")]);
}

#[test]
fn test_parser_withMultibyteSplitAcrossChunks_shouldKeepText() {
    let payload = "event: modified\ndata: {\"text\":\"简历\"}\n\n".as_bytes();
    // Split inside the first multi-byte character
    let split = payload.iter().position(|b| *b >= 0x80).unwrap() + 1;
    let frames = parse_all(&[&payload[..split], &payload[split..]]);

    match StreamEvent::decode(&frames[0]).unwrap() {
        StreamEvent::Snapshot { text, .. } => assert_eq!(text, "简历"),
        other => panic!("unexpected event {:?}", other),
    }
}

#[test]
fn test_parser_withMultipleDataLines_shouldJoinWithNewline() {
    let frames = parse_all(&[b"event: error\ndata: {\"message\":\ndata: \"boom\"}\n\n"]);
    assert_eq!(frames[0].data, "{\"message\":\n\"boom\"}");
    assert_eq!(
        StreamEvent::decode(&frames[0]).unwrap(),
        StreamEvent::ServerError {
            message: Some("boom".to_string())
        }
    );
}

#[test]
fn test_parser_withUnterminatedFinalFrame_shouldFlushOnFinish() {
    let frames = parse_all(&[b"event: success\ndata: {}"]);
    assert_eq!(frames, vec![SseFrame::named("success", "{}")]);
}

#[test]
fn test_decode_legacySequence_shouldMapToStages() {
    let cases = vec![
        (r#"{"type":"start"}"#, StreamEvent::Started),
        (
            r#"{"type":"end1","text":"engineering"}"#,
            StreamEvent::CategoryAssigned {
                category: Some("engineering".to_string()),
            },
        ),
        (
            r#"{"type":"end12","text":"backend"}"#,
            StreamEvent::SubcategoryAssigned {
                subcategory: Some("backend".to_string()),
            },
        ),
        (
            r#"{"type":"end2","text":"whole draft","status":"polishing"}"#,
            StreamEvent::Formatting {
                status: Some("polishing".to_string()),
            },
        ),
        (r#"{"type":"end3","text":"stale"}"#, StreamEvent::Succeeded { text: None }),
        (
            r#"{"type":"error","error":"quota"}"#,
            StreamEvent::ServerError {
                message: Some("quota".to_string()),
            },
        ),
    ];

    for (data, expected) in cases {
        assert_eq!(StreamEvent::decode(&SseFrame::data_only(data)).unwrap(), expected);
    }
}

#[test]
fn test_decode_successWithText_shouldCarryFinalSnapshot() {
    let frame = SseFrame::named("success", r#"{"text":"final"}"#);
    assert_eq!(
        StreamEvent::decode(&frame).unwrap(),
        StreamEvent::Succeeded {
            text: Some("final".to_string())
        }
    );
}

#[test]
fn test_decode_eventMessageName_shouldUseLegacyType() {
    let frame = SseFrame::named("message", r#"{"type":"update","text":"v3"}"#);
    assert_eq!(
        StreamEvent::decode(&frame).unwrap(),
        StreamEvent::Snapshot {
            text: "v3".to_string(),
            stage: None,
            status: None,
        }
    );
}

#[test]
fn test_decode_namedFormatting_shouldTakeTextAsStatus() {
    let frame = SseFrame::named("formatting", r#"{"text":"polishing layout"}"#);
    assert_eq!(
        StreamEvent::decode(&frame).unwrap(),
        StreamEvent::Formatting {
            status: Some("polishing layout".to_string()),
        }
    );
    assert_eq!(
        StreamEvent::decode(&SseFrame::named("formatting", "")).unwrap(),
        StreamEvent::Formatting { status: None }
    );
}

#[test]
fn test_stage_ordering_shouldFollowPipeline() {
    assert!(Stage::Classifying < Stage::Categorized);
    assert!(Stage::Transforming < Stage::Formatting);
    assert!(Stage::Formatting < Stage::Complete);
    assert_eq!(Stage::Complete.default_status(), "");
}
