// SPDX-License-Identifier: BUSL-1.1
// Copyright (c) 2026 Alfred Jean LLC

use super::*;
use dapmux_core::FakeClock;
use std::sync::Arc;

fn buffer(max_bytes: usize) -> OutputBuffer {
    OutputBuffer::new(max_bytes, Arc::new(FakeClock::new()))
}

fn push(buf: &OutputBuffer, category: OutputCategory, text: &str) {
    buf.append(category, text.to_string(), None, None);
}

#[test]
fn seq_starts_at_one_and_increases() {
    let buf = buffer(1024);
    push(&buf, OutputCategory::Stdout, "a");
    push(&buf, OutputCategory::Stdout, "b");

    let page = buf.page(0, 10, None);
    let seqs: Vec<u64> = page.lines.iter().map(|r| r.seq).collect();
    assert_eq!(seqs, vec![1, 2]);
    assert!(!page.truncated);
}

#[test]
fn eviction_is_oldest_first_and_bounded() {
    let buf = buffer(1024);
    // 4 KiB total in 16 records of 256 bytes.
    for i in 0..16 {
        push(&buf, OutputCategory::Stdout, &format!("{i:0>256}"));
    }

    let page = buf.page(0, 100, None);
    assert!(page.truncated);
    let bytes: usize = page.lines.iter().map(|r| r.text.len()).sum();
    assert!(bytes <= 1024, "retained {bytes} bytes");

    // A suffix of the original sequence, ending with the latest record.
    let seqs: Vec<u64> = page.lines.iter().map(|r| r.seq).collect();
    assert_eq!(seqs, vec![13, 14, 15, 16]);
}

#[test]
fn single_oversized_record_is_kept_alone() {
    let buf = buffer(64);
    push(&buf, OutputCategory::Stdout, "small");
    push(&buf, OutputCategory::Stdout, &"x".repeat(500));

    let page = buf.page(0, 10, None);
    assert_eq!(page.lines.len(), 1);
    assert_eq!(page.lines[0].text.len(), 500);
    assert_eq!(page.lines[0].seq, 2);
    assert!(page.truncated);
}

#[test]
fn oversized_first_record_does_not_mark_truncated() {
    let buf = buffer(64);
    push(&buf, OutputCategory::Stdout, &"x".repeat(500));

    let page = buf.page(0, 10, None);
    assert_eq!(page.lines.len(), 1);
    assert!(!page.truncated, "nothing was evicted");
}

#[test]
fn category_filter_and_pagination() {
    let buf = buffer(4096);
    for i in 0..6 {
        push(&buf, OutputCategory::Stdout, &format!("out{i}"));
        push(&buf, OutputCategory::Stderr, &format!("err{i}"));
    }

    let page = buf.page(2, 3, Some(OutputCategory::Stderr));
    assert_eq!(page.total, 6);
    let texts: Vec<&str> = page.lines.iter().map(|r| r.text.as_str()).collect();
    assert_eq!(texts, vec!["err2", "err3", "err4"]);
    assert!(page.has_more);

    let tail = buf.page(5, 3, Some(OutputCategory::Stderr));
    assert_eq!(tail.lines.len(), 1);
    assert!(!tail.has_more);
}

#[test]
fn offset_beyond_total_is_empty() {
    let buf = buffer(1024);
    push(&buf, OutputCategory::Stdout, "only");
    let page = buf.page(10, 5, None);
    assert!(page.lines.is_empty());
    assert!(!page.has_more);
    assert_eq!(page.total, 1);
}

#[test]
fn clear_resets_counters() {
    let buf = buffer(32);
    for _ in 0..10 {
        push(&buf, OutputCategory::Stdout, "0123456789abcdef");
    }
    assert!(buf.page(0, 1, None).truncated);

    buf.clear();
    let stats = buf.stats();
    assert_eq!(stats.records, 0);
    assert_eq!(stats.dropped, 0);
    assert!(!stats.truncated);

    push(&buf, OutputCategory::Stdout, "fresh");
    assert_eq!(buf.page(0, 1, None).lines[0].seq, 1);
}

#[test]
fn byte_accounting_uses_utf8_lengths() {
    let buf = buffer(8);
    push(&buf, OutputCategory::Stdout, "éé"); // 4 bytes
    push(&buf, OutputCategory::Stdout, "éé"); // 4 bytes, exactly at cap
    assert_eq!(buf.page(0, 10, None).lines.len(), 2);

    push(&buf, OutputCategory::Stdout, "é"); // 2 bytes, forces eviction
    let page = buf.page(0, 10, None);
    assert!(page.truncated);
    let bytes: usize = page.lines.iter().map(|r| r.text.len()).sum();
    assert!(bytes <= 8);
}
