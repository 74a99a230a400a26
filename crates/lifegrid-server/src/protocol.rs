//! Wire format for the websocket protocol.
//!
//! Clients send one JSON object per frame:
//!
//! ```json
//! {"command": "observe", "data": {"bounds": [[-10, -10], [10, 10]]}}
//! ```
//!
//! The server answers with text frames of the form `<code>;<json>\r\n`,
//! for example `observe_ok;{"bounds":[[-10,-10],[10,10]]}\r\n`. Object keys
//! are emitted in lexicographic order and an empty payload is `{}`.

use std::fmt;

use lifegrid_grid::GridEvent;
use lifegrid_types::Cell;
use serde::Deserialize;
use serde_json::{Map, Value};

/// Reply code, the part before the `;`.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum Code {
    /// Command succeeded with nothing to report.
    Ok,
    /// `observe` accepted.
    ObserveOk,
    /// `sync` reply.
    SyncOk,
    /// Command failed; the payload carries `error`.
    Error,
    /// Region diff pushed to an observing client.
    ObserveEvent,
}

impl Code {
    /// Wire spelling.
    pub const fn as_str(self) -> &'static str {
        match self {
            Self::Ok => "ok",
            Self::ObserveOk => "observe_ok",
            Self::SyncOk => "sync_ok",
            Self::Error => "error",
            Self::ObserveEvent => "observe_event",
        }
    }
}

impl fmt::Display for Code {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// A decoded client frame.
#[derive(Debug, Clone, PartialEq, Deserialize)]
pub struct IncomingMessage {
    /// Command name, e.g. `set_cells`.
    #[serde(default)]
    pub command: String,
    /// Command payload; absent and `null` are both treated as `{}`.
    #[serde(default)]
    pub data: Option<Value>,
}

impl IncomingMessage {
    /// Decode a frame body.
    ///
    /// # Errors
    ///
    /// Returns the JSON error if the frame is not a message object.
    pub fn parse(frame: &str) -> Result<Self, serde_json::Error> {
        serde_json::from_str(frame)
    }

    /// The payload, with a missing or `null` value replaced by `{}`.
    pub fn into_data(self) -> Value {
        match self.data {
            None | Some(Value::Null) => Value::Object(Map::new()),
            Some(value) => value,
        }
    }
}

/// A reply or push, rendered with [`Display`](fmt::Display).
#[derive(Debug, Clone, PartialEq)]
pub struct OutgoingMessage {
    code: Code,
    data: Map<String, Value>,
}

impl OutgoingMessage {
    /// A message with an empty payload.
    pub fn new(code: Code) -> Self {
        Self {
            code,
            data: Map::new(),
        }
    }

    /// `ok;{}`.
    pub fn ok() -> Self {
        Self::new(Code::Ok)
    }

    /// `error;{"error":"<message>"}`.
    pub fn error(message: impl Into<String>) -> Self {
        Self::new(Code::Error).with("error", Value::String(message.into()))
    }

    /// Add one payload field.
    #[must_use]
    pub fn with(mut self, key: &str, value: impl Into<Value>) -> Self {
        self.data.insert(key.to_owned(), value.into());
        self
    }

    /// The reply code.
    pub const fn code(&self) -> Code {
        self.code
    }

    /// The payload object.
    pub const fn data(&self) -> &Map<String, Value> {
        &self.data
    }

    /// `observe_event` push for an already clipped grid event.
    pub fn observe_event(event: &GridEvent) -> Self {
        let data = match event {
            GridEvent::BulkSet(cells) => Map::from_iter([("cells".to_owned(), cells_value(cells))]),
            GridEvent::SingleSet(cell) | GridEvent::SingleClear(cell) => {
                Map::from_iter([("cell".to_owned(), cell_value(*cell))])
            }
            GridEvent::Tick { born, died } => Map::from_iter([
                ("bornCells".to_owned(), cells_value(born)),
                ("diedCells".to_owned(), cells_value(died)),
            ]),
        };
        Self::new(Code::ObserveEvent)
            .with("data", Value::Object(data))
            .with("event", event.kind())
    }
}

impl fmt::Display for OutgoingMessage {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{};", self.code)?;
        // A map of JSON values always serializes.
        match serde_json::to_string(&self.data) {
            Ok(json) => f.write_str(&json)?,
            Err(_) => f.write_str("{}")?,
        }
        f.write_str("\r\n")
    }
}

/// `[x, y]`.
pub fn cell_value(cell: Cell) -> Value {
    Value::from(vec![cell.x(), cell.y()])
}

/// `[[x, y], ...]`.
pub fn cells_value(cells: &[Cell]) -> Value {
    Value::Array(cells.iter().copied().map(cell_value).collect())
}
