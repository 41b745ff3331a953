//! Weekly hours check against SQLite.

mod common;

use common::{add_member, at, card, monday, setup, sign_in_directly};
use rollcall_core::Error;
use rollcall_kiosk::weekly_hours;
use rollcall_storage::{AttendanceStore, NewSession, SessionClose};

async fn closed_session(
    store: &common::FlakyStore,
    member_id: i64,
    start: &str,
    end: &str,
    duration: f64,
) {
    let session = store
        .create_session(&NewSession {
            member_id,
            sign_in_time: at(start).into(),
            message: None,
        })
        .await
        .unwrap();
    store
        .close_session(
            session.id,
            &SessionClose {
                sign_out_time: at(end).into(),
                duration,
                message: None,
            },
        )
        .await
        .unwrap();
}

#[tokio::test]
async fn test_sums_closed_and_active_sessions_once() {
    let (_db, store) = setup().await;
    let ada = add_member(&store, "Ada Lovelace", "Treasurer", Some("123456")).await;

    // previous week, not counted
    closed_session(&store, ada.id, "2026-02-27T09:00:00-05:00", "2026-02-27T17:00:00-05:00", 8.0).await;
    closed_session(&store, ada.id, "2026-03-02T09:00:00-05:00", "2026-03-02T11:30:00-05:00", 2.5).await;
    // auto-signed-out session counts as zero
    closed_session(&store, ada.id, "2026-03-03T09:00:00-05:00", "2026-03-03T20:00:00-05:00", 0.0).await;
    sign_in_directly(&store, &ada, at("2026-03-04T09:00:00-05:00")).await;

    let report = weekly_hours(store.as_ref(), &card("123456"), at("2026-03-04T10:15:00-05:00"))
        .await
        .unwrap();

    assert!((report.total_hours - 3.75).abs() < 1e-9);
    assert!((report.current_hours.unwrap() - 1.25).abs() < 1e-9);
    assert_eq!(report.active_since, Some(at("2026-03-04T09:00:00-05:00")));
    assert_eq!(report.week_start, monday("00:00:00"));
    assert_eq!(
        report.lines(),
        vec![
            "Member: Ada Lovelace (Treasurer)",
            "Current Week Hours: 3.75",
            "Signed in at: 09:00 AM",
            "Current duration: 1.25 hours",
        ]
    );
}

#[tokio::test]
async fn test_no_hours_this_week() {
    let (_db, store) = setup().await;
    add_member(&store, "Ada Lovelace", "Treasurer", Some("123456")).await;

    let report = weekly_hours(store.as_ref(), &card("123456"), monday("12:00:00"))
        .await
        .unwrap();

    assert_eq!(report.total_hours, 0.0);
    assert_eq!(
        report.lines()[1],
        "No hours recorded this week for Ada Lovelace"
    );
}

#[tokio::test]
async fn test_active_session_from_last_week_counts_from_monday() {
    let (_db, store) = setup().await;
    let ada = add_member(&store, "Ada", "Treasurer", Some("123456")).await;
    sign_in_directly(&store, &ada, at("2026-03-01T22:00:00-05:00")).await;

    let report = weekly_hours(store.as_ref(), &card("123456"), monday("02:00:00"))
        .await
        .unwrap();

    assert!((report.total_hours - 2.0).abs() < 1e-9);
}

#[tokio::test]
async fn test_unknown_card() {
    let (_db, store) = setup().await;

    let err = weekly_hours(store.as_ref(), &card("000"), monday("12:00:00"))
        .await
        .unwrap_err();
    assert!(matches!(err, Error::UnknownCard(ref c) if c == "000"));
}
