use super::*;
use serde_json::json;

// =============================================================================
// parse_client_message
// =============================================================================

#[test]
fn parses_full_cursor_update() {
    let msg = parse_client_message(
        r##"{"type":"cursor_update","userId":"u1","userName":"Ada","color":"#fff","x":10,"y":20.5,"pointer":"touch"}"##,
    )
    .unwrap();
    assert_eq!(
        msg,
        ClientMessage::CursorUpdate(CursorUpdate {
            user_id: "u1".into(),
            user_name: Some("Ada".into()),
            color: Some("#fff".into()),
            x: 10.0,
            y: 20.5,
            pointer: PointerKind::Touch,
        })
    );
}

#[test]
fn cursor_update_optional_fields_may_be_absent() {
    let msg = parse_client_message(r#"{"type":"cursor_update","userId":"u1","x":0,"y":-4}"#).unwrap();
    let ClientMessage::CursorUpdate(update) = msg else {
        panic!("expected cursor update");
    };
    assert!(update.user_name.is_none());
    assert!(update.color.is_none());
    assert_eq!(update.pointer, PointerKind::Mouse);
}

#[test]
fn cursor_update_missing_x_is_rejected() {
    let err = parse_client_message(r#"{"type":"cursor_update","userId":"u1","y":3}"#).unwrap_err();
    assert!(matches!(err, MessageError::InvalidField { field: "x", .. }));
}

#[test]
fn cursor_update_string_coordinate_is_rejected() {
    let err = parse_client_message(r#"{"type":"cursor_update","userId":"u1","x":1,"y":"3"}"#).unwrap_err();
    assert!(matches!(err, MessageError::InvalidField { field: "y", .. }));
}

#[test]
fn cursor_update_without_user_id_is_rejected() {
    let err = parse_client_message(r#"{"type":"cursor_update","x":1,"y":2}"#).unwrap_err();
    assert!(matches!(err, MessageError::InvalidField { field: "userId", .. }));

    let err = parse_client_message(r#"{"type":"cursor_update","userId":"","x":1,"y":2}"#).unwrap_err();
    assert!(matches!(err, MessageError::InvalidField { field: "userId", .. }));

    let err = parse_client_message(r#"{"type":"cursor_update","userId":7,"x":1,"y":2}"#).unwrap_err();
    assert!(matches!(err, MessageError::InvalidField { field: "userId", .. }));
}

#[test]
fn non_string_name_and_color_are_treated_as_absent() {
    let msg = parse_client_message(r#"{"type":"cursor_update","userId":"u1","x":1,"y":2,"userName":5,"color":false}"#)
        .unwrap();
    let ClientMessage::CursorUpdate(update) = msg else {
        panic!("expected cursor update");
    };
    assert!(update.user_name.is_none());
    assert!(update.color.is_none());
}

#[test]
fn parses_cursor_leave() {
    let msg = parse_client_message(r#"{"type":"cursor_leave","userId":"u2"}"#).unwrap();
    assert_eq!(msg, ClientMessage::CursorLeave { user_id: "u2".into() });
}

#[test]
fn cursor_leave_without_user_id_is_rejected() {
    assert!(parse_client_message(r#"{"type":"cursor_leave"}"#).is_err());
}

#[test]
fn get_cursors_ignores_other_fields() {
    let msg = parse_client_message(r#"{"type":"get_cursors","x":"junk","userId":42}"#).unwrap();
    assert_eq!(msg, ClientMessage::GetCursors);
}

#[test]
fn unknown_type_is_carried_not_rejected() {
    let msg = parse_client_message(r#"{"type":"cursor_dance"}"#).unwrap();
    assert_eq!(msg, ClientMessage::Unknown("cursor_dance".into()));
}

#[test]
fn undecodable_payloads_are_json_errors() {
    for text in ["not json", "[]", r#"{"userId":"u1"}"#, r#"{"type":3}"#, ""] {
        let err = parse_client_message(text).unwrap_err();
        assert!(matches!(err, MessageError::Json(_)), "expected json error for {text:?}");
    }
}

// =============================================================================
// ServerMessage
// =============================================================================

#[test]
fn cursor_update_serializes_with_type_and_camel_case() {
    let msg = ServerMessage::CursorUpdate {
        user_id: "u1".into(),
        user_name: "Ada".into(),
        color: "#fff".into(),
        x: 10.0,
        y: 20.0,
        pointer: PointerKind::Mouse,
    };
    let value: Value = serde_json::from_str(&msg.to_json().unwrap()).unwrap();
    assert_eq!(
        value,
        json!({
            "type": "cursor_update",
            "userId": "u1",
            "userName": "Ada",
            "color": "#fff",
            "x": 10.0,
            "y": 20.0,
            "pointer": "mouse",
        })
    );
}

#[test]
fn user_left_serializes() {
    let msg = ServerMessage::UserLeft { user_id: "u9".into() };
    let value: Value = serde_json::from_str(&msg.to_json().unwrap()).unwrap();
    assert_eq!(value, json!({"type": "user_left", "userId": "u9"}));
    assert_eq!(msg.kind(), "user_left");
}

#[test]
fn empty_sync_serializes_empty_array() {
    let msg = ServerMessage::CursorsSync { cursors: Vec::new() };
    let value: Value = serde_json::from_str(&msg.to_json().unwrap()).unwrap();
    assert_eq!(value, json!({"type": "cursors_sync", "cursors": []}));
    assert_eq!(msg.kind(), "cursors_sync");
}
