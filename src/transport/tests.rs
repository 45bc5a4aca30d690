use super::message::{Envelope, InboundEvent, InboundFrame, OutboundEvent, OutboundFrame};
use crate::utils::error::CommandError;
use serde_json::json;

#[test]
fn test_envelope_round_trip() {
    let cases = [
        Envelope::new(1, None, None),
        Envelope::new(2, Some("t".into()), None),
        Envelope::new(3, None, Some("body".into())),
        Envelope::new(4, Some("t".into()), Some("multi\nline".into())),
    ];
    for envelope in cases {
        let text = envelope.encode().unwrap();
        assert_eq!(Envelope::decode(&text).unwrap(), envelope);
    }
}

#[test]
fn test_envelope_absent_fields_are_null() {
    let envelope = Envelope::decode(r#"{"timestamp": 7}"#).unwrap();
    assert_eq!(envelope, Envelope::new(7, None, None));

    let encoded: serde_json::Value =
        serde_json::from_str(&Envelope::reply(9, "ok").encode().unwrap()).unwrap();
    assert_eq!(
        encoded,
        json!({"timestamp": 9, "topic": null, "payload": "ok"})
    );
}

#[test]
fn test_envelope_ignores_unknown_fields() {
    let envelope =
        Envelope::decode(r#"{"timestamp": 1, "topic": "t", "qos": 1, "extra": [1, 2]}"#).unwrap();
    assert_eq!(envelope, Envelope::new(1, Some("t".into()), None));
}

#[test]
fn test_envelope_requires_timestamp() {
    assert!(Envelope::decode(r#"{"topic": "t"}"#).is_err());
    assert!(Envelope::decode(r#"{"timestamp": "soon"}"#).is_err());
}

#[test]
fn test_inbound_frame_accepts_object_string_or_null() {
    let object = InboundFrame::parse(
        &json!({"event": "SUBSCRIBE_TOPIC", "data": {"timestamp": 1, "topic": "t"}}).to_string(),
    )
    .unwrap();
    assert_eq!(object.event, InboundEvent::SubscribeTopic);
    assert_eq!(
        object.envelope(),
        Ok(Some(Envelope::new(1, Some("t".into()), None)))
    );

    let as_string = InboundFrame::parse(
        &json!({"event": "PUBLISH_TOPIC", "data": r#"{"timestamp": 2, "topic": "t", "payload": "p"}"#})
            .to_string(),
    )
    .unwrap();
    assert_eq!(
        as_string.envelope(),
        Ok(Some(Envelope::new(2, Some("t".into()), Some("p".into()))))
    );

    let null = InboundFrame::parse(r#"{"event": "LIST_TOPICS", "data": null}"#).unwrap();
    assert_eq!(null.envelope(), Ok(None));
    let absent = InboundFrame::parse(r#"{"event": "GET_TOPIC_STATUS"}"#).unwrap();
    assert_eq!(absent.envelope(), Ok(None));
}

#[test]
fn test_inbound_frame_bad_data_is_invalid_payload() {
    let frame = InboundFrame::parse(r#"{"event": "SUBSCRIBE_TOPIC", "data": [1, 2, 3]}"#).unwrap();
    assert_eq!(frame.envelope(), Err(CommandError::InvalidPayload));
}

#[test]
fn test_unknown_event_is_rejected() {
    assert!(InboundFrame::parse(r#"{"event": "DELETE_TOPIC", "data": null}"#).is_err());
}

#[test]
fn test_outbound_frame_event_names() {
    let frame = OutboundFrame::new(OutboundEvent::PrintMessageAndExit, Envelope::reply(1, "bye"));
    let value: serde_json::Value = serde_json::from_str(&frame.encode().unwrap()).unwrap();
    assert_eq!(value["event"], "PRINT_MESSAGE_AND_EXIT");
    assert_eq!(value["data"]["payload"], "bye");
    assert!(frame.is_terminal());

    let info = OutboundFrame::new(OutboundEvent::PrintMessage, Envelope::reply(1, "hi"));
    assert!(info.encode().unwrap().contains("\"PRINT_MESSAGE\""));
    assert!(!info.is_terminal());
}
