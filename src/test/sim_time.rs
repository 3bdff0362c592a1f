use crate::sim::SimTime;

#[test]
fn sim_time_unit_conversions() {
    assert_eq!(SimTime::from_nanos(7).as_nanos(), 7);
    assert_eq!(SimTime::from_micros(1), SimTime(1_000));
    assert_eq!(SimTime::from_millis(1), SimTime(1_000_000));
    assert_eq!(SimTime::from_secs(1), SimTime(1_000_000_000));
    assert_eq!(SimTime::from_secs_f64(0.5), SimTime(500_000_000));
    assert_eq!(SimTime::from_secs_f64(-1.0), SimTime::ZERO);
    assert_eq!(SimTime::from_millis(1_500).as_secs_f64(), 1.5);
}

#[test]
fn sim_time_arithmetic_saturates() {
    assert_eq!(SimTime::from_micros(u64::MAX), SimTime(u64::MAX));
    assert_eq!(SimTime::from_millis(u64::MAX), SimTime(u64::MAX));
    assert_eq!(SimTime::from_secs(u64::MAX), SimTime(u64::MAX));
    assert_eq!(SimTime::MAX.saturating_add(SimTime(1)), SimTime::MAX);
    assert_eq!(SimTime(3).saturating_sub(SimTime(5)), SimTime::ZERO);
    assert_eq!(SimTime(u64::MAX / 2 + 1).saturating_mul(2), SimTime::MAX);
}

#[test]
fn sim_time_serializes_as_nanoseconds() {
    let json = serde_json::to_string(&SimTime::from_millis(2)).expect("serialize");
    assert_eq!(json, "2000000");
    let back: SimTime = serde_json::from_str("5").expect("deserialize");
    assert_eq!(back, SimTime(5));
}
