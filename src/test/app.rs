use crate::proto::app::{BulkSource, TcpSink};

#[test]
fn bulk_source_fills_send_buffer_then_waits_for_acks() {
    let mut app = BulkSource::new(10_000, 4_000);
    assert_eq!(app.next_write(0), 4_000);
    assert_eq!(app.next_write(4_000), 0);
    // 1000 bytes acked
    assert_eq!(app.next_write(3_000), 1_000);
    assert_eq!(app.written(), 5_000);
    assert!(!app.is_closed());
}

#[test]
fn bulk_source_stops_at_its_byte_budget() {
    let mut app = BulkSource::new(5_000, 4_000);
    assert_eq!(app.next_write(0), 4_000);
    assert_eq!(app.next_write(0), 1_000);
    assert!(app.is_closed());
    assert_eq!(app.next_write(0), 0);
    assert_eq!(app.written(), app.max_bytes());
}

#[test]
fn bulk_source_without_budget_runs_until_stopped() {
    let mut app = BulkSource::new(0, 1_000);
    assert_eq!(app.next_write(0), 1_000);
    assert_eq!(app.next_write(0), 1_000);
    app.stop();
    assert!(app.is_closed());
    assert_eq!(app.next_write(0), 0);
    assert_eq!(app.written(), 2_000);
}

#[test]
fn sink_acks_in_order_data_cumulatively() {
    let mut sink = TcpSink::default();
    assert_eq!(sink.on_segment(0, 536), 536);
    assert_eq!(sink.on_segment(536, 536), 1072);
    assert_eq!(sink.bytes_received(), 1072);
    assert_eq!(sink.segments(), 2);
}

#[test]
fn sink_buffers_out_of_order_segments_and_fills_the_hole() {
    let mut sink = TcpSink::default();
    assert_eq!(sink.on_segment(0, 100), 100);
    // 100..200 lost
    assert_eq!(sink.on_segment(200, 100), 100);
    assert_eq!(sink.on_segment(300, 100), 100);
    assert_eq!(sink.buffered_ranges(), 2);

    assert_eq!(sink.on_segment(100, 100), 400);
    assert_eq!(sink.buffered_ranges(), 0);
    assert_eq!(sink.rcv_nxt(), 400);
}

#[test]
fn sink_counts_duplicates_without_moving_ack() {
    let mut sink = TcpSink::default();
    sink.on_segment(0, 100);
    sink.on_segment(100, 100);
    assert_eq!(sink.on_segment(0, 100), 200);
    assert_eq!(sink.dup_segments(), 1);

    // overlapping retransmission extends the ack
    assert_eq!(sink.on_segment(150, 100), 250);
    assert_eq!(sink.dup_segments(), 1);
}
