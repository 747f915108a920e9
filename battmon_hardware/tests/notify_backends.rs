use battmon_hardware::{LogNotifier, NotifySend, SimulatedSensor};
use battmon_traits::{Notifier, PowerSensor, Urgency};
use rstest::rstest;

#[cfg(unix)]
#[rstest]
#[case("true", true)]
#[case("false", false)]
fn notify_send_reports_exit_status(#[case] program: &str, #[case] ok: bool) {
    let n = NotifySend::with_program(program);
    assert_eq!(n.notify(Urgency::Critical, "Battery", "Battery at 4%.").is_ok(), ok);
}

#[test]
fn boxed_backends_are_interchangeable() {
    let backends: Vec<Box<dyn Notifier + Send>> = vec![
        Box::new(LogNotifier),
        Box::new(NotifySend::with_program("/nonexistent/notify")),
    ];
    let results: Vec<bool> = backends
        .iter()
        .map(|b| b.notify(Urgency::Normal, "t", "b").is_ok())
        .collect();
    assert_eq!(results, vec![true, false]);
}

#[test]
fn boxed_sensor_reads_through() {
    let mut s: Box<dyn PowerSensor + Send> = Box::new(SimulatedSensor::discharging(12.0, -400.0));
    let r = s.read().unwrap();
    assert_eq!(r.voltage, 12.0);
    assert_eq!(r.current_ma, -400.0);
}
