use serde::Serialize;

use crate::protocol::codec;
use crate::protocol::events::BusEvent;

const BLUE: &str = "\x1b[94m";
const GREEN: &str = "\x1b[92m";
const YELLOW: &str = "\x1b[93m";
const RED: &str = "\x1b[91m";
const RESET: &str = "\x1b[0m";

/// Rendering configuration, passed explicitly to the formatter; there is no
/// process-wide color state.
#[derive(Debug, Clone, Copy, Default)]
pub struct TraceStyle {
    pub color: bool,
}

impl TraceStyle {
    pub const PLAIN: Self = Self { color: false };
    pub const COLOR: Self = Self { color: true };

    fn paint(&self, color: &str, text: &str) -> String {
        if self.color {
            format!("{color}{text}{RESET}")
        } else {
            text.to_string()
        }
    }
}

/// Render one transaction as a trace line.
///
/// The counter advances once per start condition, so a repeated-start
/// transaction consumes one sequence number per start. Returns the rendered
/// line and the advanced counter.
pub fn render_line(
    events: impl IntoIterator<Item = BusEvent>,
    counter: u64,
    style: &TraceStyle,
) -> (String, u64) {
    let mut parts: Vec<String> = Vec::new();
    let mut counter = counter;
    for event in events {
        match event {
            BusEvent::Start => {
                counter += 1;
                parts.push(format!("{counter:04} {}", style.paint(BLUE, "START")));
            }
            BusEvent::Data {
                value,
                is_address: true,
            } => {
                let op = if codec::is_read(value) { "R" } else { "W" };
                let address = format!("{:02x}", codec::to_seven_bit_address(value));
                parts.push(style.paint(YELLOW, op));
                parts.push(style.paint(YELLOW, &address));
            }
            BusEvent::Data {
                value,
                is_address: false,
            } => parts.push(format!("{value:02x}")),
            BusEvent::Ack { acked: true } => parts.push(style.paint(GREEN, "A")),
            BusEvent::Ack { acked: false } => parts.push(style.paint(RED, "N")),
            BusEvent::Stop => parts.push(style.paint(BLUE, "STOP")),
        }
    }
    (parts.join(" "), counter)
}

#[derive(Serialize)]
struct TraceRecord<'a> {
    #[serde(skip_serializing_if = "Option::is_none")]
    ts: Option<&'a str>,
    seq: u64,
    events: &'a [BusEvent],
}

/// Render one transaction as a single-line JSON record.
///
/// `seq` is the sequence number given to the record's first start condition;
/// the counter still advances once per start, so numbering matches text
/// mode. A record with no start condition keeps the counter unchanged.
pub fn render_json(
    events: &[BusEvent],
    counter: u64,
    ts: Option<&str>,
) -> Result<(String, u64), serde_json::Error> {
    let starts = events
        .iter()
        .filter(|event| matches!(event, BusEvent::Start))
        .count() as u64;
    let record = TraceRecord {
        ts,
        seq: counter + u64::from(starts > 0),
        events,
    };
    Ok((serde_json::to_string(&record)?, counter + starts))
}
