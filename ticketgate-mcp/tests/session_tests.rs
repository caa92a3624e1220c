//! Session state tests

use ticketgate_core::Principal;
use ticketgate_mcp::protocol::Implementation;
use ticketgate_mcp::Session;

fn principal() -> Principal {
    Principal::new(7, "agent.smith", "Agent Smith")
}

#[test]
fn test_session_creation() {
    let session = Session::new(principal());

    assert!(!session.session_id().is_empty());
    assert_eq!(session.principal().login, "agent.smith");
    assert!(!session.is_initialized());
    assert!(session.client_info().is_none());
}

#[test]
fn test_session_ids_are_unique() {
    let a = Session::new(principal());
    let b = Session::new(principal());

    assert_ne!(a.session_id(), b.session_id());
}

#[test]
fn test_session_mark_initialized() {
    let session = Session::new(principal());

    session.mark_initialized();
    assert!(session.is_initialized());

    // Repeated acknowledgments are harmless
    session.mark_initialized();
    assert!(session.is_initialized());
}

#[test]
fn test_session_records_client() {
    let session = Session::new(principal());

    session.record_client(Some(Implementation {
        name: "inspector".to_string(),
        version: "1.2.0".to_string(),
    }));

    let client = session.client_info().unwrap();
    assert_eq!(client.name, "inspector");
    assert_eq!(client.version, "1.2.0");
}

#[test]
fn test_session_duration() {
    let session = Session::new(principal());

    // Duration should be very small (just created)
    let duration = session.duration_ms();
    assert!(duration >= 0);
    assert!(duration < 1000); // Less than 1 second
}

#[test]
fn test_session_summary() {
    let session = Session::new(principal());
    session.mark_initialized();

    let summary = serde_json::to_value(session.summary()).unwrap();
    assert_eq!(summary["login"], "agent.smith");
    assert_eq!(summary["initialized"], true);
    assert_eq!(summary["session_id"], session.session_id());
}
