mod support;

use support::{DialogProbe, RecordingBus};
use xdg_desktop_portal_otto_dialogs::dialog::Dispatcher;
use xdg_desktop_portal_otto_dialogs::error::DispatchError;
use xdg_desktop_portal_otto_dialogs::portal::app_choice_results;
use xdg_desktop_portal_otto_dialogs::request::{Request, ResponseCode};

const PATH: &str = "/org/freedesktop/portal/desktop/request/1_23/r1";

fn request() -> Request<RecordingBus> {
    Request::new(":1.23", "org.foo", "r1")
}

#[tokio::test]
async fn acceptance_emits_one_response_and_unexports() {
    let (mut dispatcher, dialogs) = Dispatcher::new();
    let bus = RecordingBus::default();
    let probe = DialogProbe::default();

    let (opened, _) = tokio::join!(
        dialogs.open(request(), probe.dialog(), bus.clone()),
        dispatcher.step()
    );
    opened.expect("dialog should open");
    assert_eq!(probe.presented(), 1);
    assert!(bus.is_registered(PATH));
    assert_eq!(dispatcher.open_dialogs(), 1);

    probe
        .take_outcome()
        .accept(app_choice_results(ResponseCode::Success, "bar.desktop"));
    assert!(dispatcher.step().await);

    let signals = bus.take_signals();
    assert_eq!(signals.len(), 1);
    assert_eq!(signals[0].path, PATH);
    assert_eq!(signals[0].destination, ":1.23");
    assert_eq!(signals[0].code, 0);
    assert_eq!(signals[0].string("chosen").as_deref(), Some("bar.desktop"));

    assert!(!bus.is_registered(PATH));
    assert_eq!(probe.closed(), 1);
    assert_eq!(dispatcher.open_dialogs(), 0);
}

#[tokio::test]
async fn cancel_emits_code_one() {
    let (mut dispatcher, dialogs) = Dispatcher::new();
    let bus = RecordingBus::default();
    let probe = DialogProbe::default();

    let (opened, _) = tokio::join!(
        dialogs.open(request(), probe.dialog(), bus.clone()),
        dispatcher.step()
    );
    opened.unwrap();

    probe.take_outcome().cancel();
    dispatcher.step().await;

    let signals = bus.take_signals();
    assert_eq!(signals.len(), 1);
    assert_eq!(signals[0].code, 1);
    assert!(signals[0].results.is_empty());
}

#[tokio::test]
async fn close_ends_the_dialog_without_a_response() {
    let (mut dispatcher, dialogs) = Dispatcher::new();
    let bus = RecordingBus::default();
    let probe = DialogProbe::default();

    let (opened, _) = tokio::join!(
        dialogs.open(request(), probe.dialog(), bus.clone()),
        dispatcher.step()
    );
    opened.unwrap();

    assert!(bus.close(PATH));
    dispatcher.step().await;

    assert_eq!(bus.signal_count(), 0);
    assert!(!bus.is_registered(PATH));
    assert_eq!(probe.closed(), 1);

    // the dialog answering late changes nothing
    probe
        .take_outcome()
        .accept(app_choice_results(ResponseCode::Success, "bar.desktop"));
    dispatcher.step().await;

    assert_eq!(bus.signal_count(), 0);
    assert_eq!(probe.closed(), 1);
    assert_eq!(bus.unregistered(), vec![PATH.to_string()]);
}

#[tokio::test]
async fn outcome_queued_before_close_wins() {
    let (mut dispatcher, dialogs) = Dispatcher::new();
    let bus = RecordingBus::default();
    let probe = DialogProbe::default();

    let (opened, _) = tokio::join!(
        dialogs.open(request(), probe.dialog(), bus.clone()),
        dispatcher.step()
    );
    opened.unwrap();

    probe
        .take_outcome()
        .accept(app_choice_results(ResponseCode::Success, "bar.desktop"));
    assert!(bus.close(PATH));
    dispatcher.step().await;
    dispatcher.step().await;

    assert_eq!(bus.signal_count(), 1);
    assert_eq!(probe.closed(), 1);
    assert_eq!(bus.unregistered(), vec![PATH.to_string()]);
}

#[tokio::test]
async fn close_queued_before_outcome_wins() {
    let (mut dispatcher, dialogs) = Dispatcher::new();
    let bus = RecordingBus::default();
    let probe = DialogProbe::default();

    let (opened, _) = tokio::join!(
        dialogs.open(request(), probe.dialog(), bus.clone()),
        dispatcher.step()
    );
    opened.unwrap();

    assert!(bus.close(PATH));
    probe
        .take_outcome()
        .accept(app_choice_results(ResponseCode::Success, "bar.desktop"));
    dispatcher.step().await;
    dispatcher.step().await;

    assert_eq!(bus.signal_count(), 0);
    assert_eq!(probe.closed(), 1);
    assert_eq!(dispatcher.open_dialogs(), 0);
}

#[tokio::test]
async fn failed_export_completes_locally() {
    let (mut dispatcher, dialogs) = Dispatcher::new();
    let bus = RecordingBus::default();
    let probe = DialogProbe::default();
    bus.reject(PATH);

    let (opened, _) = tokio::join!(
        dialogs.open(request(), probe.dialog(), bus.clone()),
        dispatcher.step()
    );
    opened.expect("export failure is not an open failure");
    assert_eq!(probe.presented(), 1);
    assert_eq!(bus.registered(), 0);

    probe
        .take_outcome()
        .accept(app_choice_results(ResponseCode::Success, "bar.desktop"));
    dispatcher.step().await;

    assert_eq!(bus.signal_count(), 0);
    assert!(bus.unregistered().is_empty());
    assert_eq!(probe.closed(), 1);
    assert_eq!(dispatcher.open_dialogs(), 0);
}

#[tokio::test]
async fn dialogs_are_independent() {
    let (mut dispatcher, dialogs) = Dispatcher::new();
    let bus = RecordingBus::default();
    let first = DialogProbe::default();
    let second = DialogProbe::default();

    let (opened, _) = tokio::join!(
        dialogs.open(request(), first.dialog(), bus.clone()),
        dispatcher.step()
    );
    let first_id = opened.unwrap();
    let (opened, _) = tokio::join!(
        dialogs.open(
            Request::new(":1.23", "org.foo", "r2"),
            second.dialog(),
            bus.clone()
        ),
        dispatcher.step()
    );
    let second_id = opened.unwrap();
    assert_ne!(first_id, second_id);

    second.take_outcome().cancel();
    dispatcher.step().await;

    assert_eq!(first.closed(), 0);
    assert_eq!(second.closed(), 1);
    assert!(bus.is_registered(PATH));
    assert_eq!(dispatcher.open_dialogs(), 1);

    assert!(bus.close(PATH));
    dispatcher.step().await;
    assert_eq!(first.closed(), 1);
    assert_eq!(bus.signal_count(), 1);
}

#[tokio::test]
async fn reply_delivery_answers_the_call() {
    let (mut dispatcher, dialogs) = Dispatcher::new();
    let bus = RecordingBus::default();
    let probe = DialogProbe::default();

    let driver = async {
        dispatcher.step().await;
        probe.take_outcome().accept(());
        dispatcher.step().await;
    };
    let (answer, ()) = tokio::join!(
        dialogs.open_with_reply(request(), probe.dialog(), bus.clone()),
        driver
    );

    let (code, results) = answer.expect("answer should arrive");
    assert_eq!(code, ResponseCode::Success);
    assert!(results.is_empty());
    assert_eq!(bus.signal_count(), 0);
    assert!(!bus.is_registered(PATH));
    assert_eq!(probe.closed(), 1);
}

#[tokio::test]
async fn reply_delivery_answers_close_with_other() {
    let (mut dispatcher, dialogs) = Dispatcher::new();
    let bus = RecordingBus::default();
    let probe = DialogProbe::default();

    let driver = async {
        dispatcher.step().await;
        assert!(bus.close(PATH));
        dispatcher.step().await;
    };
    let (answer, ()) = tokio::join!(
        dialogs.open_with_reply(request(), probe.dialog(), bus.clone()),
        driver
    );

    let (code, results) = answer.expect("close should still answer");
    assert_eq!(code, ResponseCode::Other);
    assert!(results.is_empty());
    assert_eq!(bus.signal_count(), 0);
    assert_eq!(probe.closed(), 1);
}

#[tokio::test]
async fn stopped_dispatcher_rejects_dialogs() {
    let (dispatcher, dialogs) = Dispatcher::<RecordingBus>::new();
    drop(dispatcher);

    let probe = DialogProbe::default();
    let err = dialogs
        .open(request(), probe.dialog(), RecordingBus::default())
        .await
        .expect_err("nothing is running");
    assert!(matches!(err, DispatchError::Stopped));
    assert_eq!(probe.presented(), 0);
}

#[tokio::test]
async fn run_returns_once_every_handle_is_dropped() {
    let (dispatcher, dialogs) = Dispatcher::<RecordingBus>::new();
    drop(dialogs);
    dispatcher.run().await;
}
