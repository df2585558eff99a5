mod common;

use common::{Fired, ORIGIN, Recorder, URL, credentials, frame_setup, platform, ready};
use paybridge::platform::fake::PostTarget;
use paybridge::{
	Display, FrameOptions, Orchestrator, OrchestratorOptions, SavedPaymentMethod, SessionConfig, Started, Success,
};
use serde_json::json;

#[test]
fn frame_replaces_existing_host_children() {
	let platform = platform();
	let recorder = Recorder::new();
	let orchestrator = Orchestrator::new(platform.clone());
	let host = platform.create_host(2);

	let started = orchestrator.start(frame_setup(&recorder, host)).unwrap();
	let Started::Frame { frame, .. } = started else {
		panic!("expected a frame session");
	};

	assert_eq!(platform.host_children(&host), vec![format!("frame#{}", frame.0)]);
	let clear = platform.call_index(&format!("clear_host:{}", host.0)).unwrap();
	let mount = platform.call_index(&format!("mount_frame:{}", frame.0)).unwrap();
	assert!(clear < mount);

	let record = &platform.frames()[0];
	assert_eq!(record.url, URL);
	assert_eq!(record.allow, "payment");
	assert_eq!(platform.live_intervals(), 0, "frames are never polled");
}

#[test]
fn setup_handshake_delivers_method() {
	let platform = platform();
	let recorder = Recorder::new();
	let orchestrator = Orchestrator::new(platform.clone());
	let host = platform.create_host(0);

	let started = orchestrator.start(frame_setup(&recorder, host)).unwrap();
	let Started::Frame { frame, .. } = started else {
		panic!("expected a frame session");
	};

	platform.deliver_window_message(ORIGIN, ready());
	let posted = platform.posted();
	assert_eq!(posted.len(), 1);
	assert_eq!(posted[0].target, PostTarget::Frame(frame.0));

	platform.deliver_port_message(json!({
		"type": "PAYMENT_METHOD_ADDED",
		"paymentMethod": {"id": "pm_1", "last4": "4242"}
	}));

	assert_eq!(
		recorder.fired(),
		vec![Fired::Success(Success::PaymentMethod(SavedPaymentMethod {
			payment_method: json!({"id": "pm_1", "last4": "4242"}),
		}))]
	);
	assert!(platform.host_children(&host).is_empty());
	assert!(platform.is_quiescent());
}

#[test]
fn setup_cancel_message_fires_cancel() {
	let platform = platform();
	let recorder = Recorder::new();
	let orchestrator = Orchestrator::new(platform.clone());
	let host = platform.create_host(0);

	orchestrator.start(frame_setup(&recorder, host)).unwrap();
	platform.deliver_window_message(ORIGIN, ready());
	platform.deliver_port_message(json!({"type": "PAYMENT_COMPLETED", "status": "CANCELED"}));

	assert_eq!(recorder.fired(), vec![Fired::Cancel]);
}

#[test]
fn frame_options_and_defaults_are_applied() {
	let platform = platform();
	let recorder = Recorder::new();
	let mut options = OrchestratorOptions::default();
	options.frame.height = "540px".into();
	let orchestrator = Orchestrator::with_options(platform.clone(), options);
	let host = platform.create_host(0);

	let config = SessionConfig::payment(
		URL,
		credentials(),
		Display::Frame(FrameOptions::new(host).with_class_name("pb-frame").with_allow("payment *")),
	)
	.with_callbacks(recorder.callbacks());
	orchestrator.start(config).unwrap();

	let record = &platform.frames()[0];
	assert_eq!(record.width, "100%");
	assert_eq!(record.height, "540px");
	assert_eq!(record.class_name.as_deref(), Some("pb-frame"));
	assert_eq!(record.allow, "payment *");
}

#[test]
fn restarting_on_same_host_keeps_one_frame() {
	let platform = platform();
	let recorder = Recorder::new();
	let orchestrator = Orchestrator::new(platform.clone());
	let host = platform.create_host(1);

	orchestrator.start(frame_setup(&recorder, host)).unwrap();
	orchestrator.start(frame_setup(&recorder, host)).unwrap();

	assert_eq!(platform.host_children(&host).len(), 1);
	assert_eq!(platform.frames().iter().filter(|f| !f.removed).count(), 1);
	assert_eq!(platform.live_listeners(), 1);
	assert!(recorder.fired().is_empty());
}

#[test]
fn mount_failure_rejects_and_removes_listener() {
	let platform = platform();
	platform.set_fail_mount(true);
	let recorder = Recorder::new();
	let orchestrator = Orchestrator::new(platform.clone());
	let host = platform.create_host(0);

	let err = orchestrator.start(frame_setup(&recorder, host)).unwrap_err();

	assert!(matches!(err, paybridge::Error::FrameMount(_)));
	assert_eq!(recorder.fired(), vec![Fired::Error(err)]);
	assert!(platform.is_quiescent());
}
