//! 应用层：批量发送端（BulkSource）与接收端（TcpSink）
//!
//! BulkSource 只负责“往连接里写多少字节”，真正的发包受拥塞窗口约束；
//! TcpSink 负责乱序重组并给出累计 ACK。

use std::collections::BTreeMap;

/// 批量发送应用：只要发送缓冲有空间就继续写，直到写满字节预算。
#[derive(Debug, Clone)]
pub struct BulkSource {
    /// 字节预算；0 表示不限
    max_bytes: u64,
    /// 连接发送缓冲大小（已写入但未确认的字节上限）
    send_buffer_bytes: u64,
    written: u64,
    stopped: bool,
}

impl BulkSource {
    pub fn new(max_bytes: u64, send_buffer_bytes: u64) -> Self {
        Self {
            max_bytes,
            send_buffer_bytes: send_buffer_bytes.max(1),
            written: 0,
            stopped: false,
        }
    }

    pub fn written(&self) -> u64 {
        self.written
    }

    pub fn max_bytes(&self) -> u64 {
        self.max_bytes
    }

    /// 预算已写完，或应用已被停止
    pub fn is_closed(&self) -> bool {
        self.stopped || (self.max_bytes > 0 && self.written >= self.max_bytes)
    }

    pub fn stop(&mut self) {
        self.stopped = true;
    }

    /// 给定连接当前未确认的字节数，返回本次应写入多少字节。
    pub fn next_write(&mut self, unacked_bytes: u64) -> u64 {
        if self.is_closed() {
            return 0;
        }
        let room = self.send_buffer_bytes.saturating_sub(unacked_bytes);
        let n = if self.max_bytes == 0 {
            room
        } else {
            room.min(self.max_bytes - self.written)
        };
        self.written = self.written.saturating_add(n);
        n
    }
}

/// 接收端：缓存乱序段，维护最高连续字节。
#[derive(Debug, Clone, Default)]
pub struct TcpSink {
    rcv_nxt: u64,
    /// seq -> end（不含），均在 rcv_nxt 之后
    out_of_order: BTreeMap<u64, u64>,
    segments: u64,
    dup_segments: u64,
}

impl TcpSink {
    /// 下一个期望的字节（即累计 ACK 值）
    pub fn rcv_nxt(&self) -> u64 {
        self.rcv_nxt
    }

    /// 按序交付给应用的字节数
    pub fn bytes_received(&self) -> u64 {
        self.rcv_nxt
    }

    pub fn segments(&self) -> u64 {
        self.segments
    }

    /// 完全落在已接收区间内的重复段
    pub fn dup_segments(&self) -> u64 {
        self.dup_segments
    }

    pub fn buffered_ranges(&self) -> usize {
        self.out_of_order.len()
    }

    /// 收到一个数据段，返回应发送的累计 ACK。
    pub fn on_segment(&mut self, seq: u64, len: u32) -> u64 {
        self.segments += 1;
        let end = seq.saturating_add(len as u64);
        if end <= self.rcv_nxt {
            self.dup_segments += 1;
            return self.rcv_nxt;
        }
        if seq > self.rcv_nxt {
            let slot = self.out_of_order.entry(seq).or_insert(end);
            *slot = (*slot).max(end);
            return self.rcv_nxt;
        }

        self.rcv_nxt = end;
        // 合并已缓存、现在变为连续的区间
        while let Some((&s, &e)) = self.out_of_order.first_key_value() {
            if s > self.rcv_nxt {
                break;
            }
            self.out_of_order.remove(&s);
            self.rcv_nxt = self.rcv_nxt.max(e);
        }
        self.rcv_nxt
    }
}
