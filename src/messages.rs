// messages.rs - Wire types: inbound commands, responses, outbound events

use crate::core_types::{TimestampMs, TradeId, UserId};
use crate::models::Side;
use serde::{Deserialize, Serialize};
use uuid::Uuid;

/// Inbound command, one per engine invocation.
///
/// All monetary fields arrive as decimal strings and are parsed against
/// the market's asset precision before any state is touched.
#[derive(Debug, Clone, Deserialize)]
#[serde(tag = "type", content = "data")]
pub enum Command {
    #[serde(rename = "CREATE_ORDER")]
    CreateOrder {
        market: String,
        price: String,
        quantity: String,
        side: Side,
        #[serde(rename = "userId")]
        user_id: UserId,
    },
    #[serde(rename = "CANCEL_ORDER")]
    CancelOrder {
        #[serde(rename = "orderId")]
        order_id: String,
        market: String,
    },
    #[serde(rename = "GET_DEPTH")]
    GetDepth { market: String },
    #[serde(rename = "GET_TICKER")]
    GetTicker { market: String },
    #[serde(rename = "GET_KLINE")]
    GetKline {
        market: String,
        #[serde(default)]
        interval: Option<String>,
        #[serde(default)]
        limit: Option<usize>,
    },
}

/// One fill as reported back to the order's owner.
#[derive(Debug, Clone, Serialize, PartialEq, Eq)]
pub struct FillData {
    pub price: String,
    pub qty: String,
    #[serde(rename = "tradeId")]
    pub trade_id: TradeId,
    #[serde(rename = "otherUserId")]
    pub other_user_id: UserId,
    #[serde(rename = "makerOrderId")]
    pub maker_order_id: Uuid,
}

#[derive(Debug, Clone, Serialize, PartialEq, Eq)]
pub struct DepthPayload {
    pub symbol: String,
    /// Price level pairs as decimal strings, best first.
    pub bids: Vec<(String, String)>,
    pub asks: Vec<(String, String)>,
    pub timestamp: TimestampMs,
}

#[derive(Debug, Clone, Serialize, PartialEq, Eq)]
pub struct TickerPayload {
    pub symbol: String,
    pub price: String,
    #[serde(rename = "priceChange")]
    pub price_change: String,
    #[serde(rename = "priceChangePercent")]
    pub price_change_percent: String,
    #[serde(rename = "high24h")]
    pub high_24h: String,
    #[serde(rename = "low24h")]
    pub low_24h: String,
    #[serde(rename = "volume24h")]
    pub volume_24h: String,
    #[serde(rename = "quoteVolume24h")]
    pub quote_volume_24h: String,
    pub timestamp: TimestampMs,
}

#[derive(Debug, Clone, Serialize, PartialEq, Eq)]
pub struct CandlePayload {
    #[serde(rename = "openTime")]
    pub open_time: TimestampMs,
    #[serde(rename = "closeTime")]
    pub close_time: TimestampMs,
    pub open: String,
    pub high: String,
    pub low: String,
    pub close: String,
    pub volume: String,
    pub trades: u64,
    #[serde(rename = "isClosed")]
    pub is_closed: bool,
}

/// Response to one command, delivered to the request's originator.
#[derive(Debug, Clone, Serialize, PartialEq, Eq)]
#[serde(tag = "type", content = "payload")]
pub enum Response {
    #[serde(rename = "ORDER_PLACED")]
    OrderPlaced {
        #[serde(rename = "orderId")]
        order_id: Uuid,
        #[serde(rename = "executedQuantity")]
        executed_quantity: String,
        fills: Vec<FillData>,
    },
    #[serde(rename = "ORDER_CANCELLED")]
    OrderCancelled {
        #[serde(rename = "orderId")]
        order_id: String,
        #[serde(rename = "executedQuantity")]
        executed_quantity: String,
        #[serde(rename = "remainingQuantity")]
        remaining_quantity: String,
    },
    #[serde(rename = "DEPTH")]
    Depth(DepthPayload),
    #[serde(rename = "TICKER")]
    Ticker(TickerPayload),
    #[serde(rename = "KLINE")]
    Kline {
        symbol: String,
        interval: String,
        candles: Vec<CandlePayload>,
    },
}

/// Fire-and-forget market data event, keyed by topic string
/// `<kind>@<symbol>[@<interval>]` for external fan-out.
#[derive(Debug, Clone, Serialize, PartialEq, Eq)]
#[serde(tag = "event", rename_all = "lowercase")]
pub enum MarketEvent {
    Trade {
        symbol: String,
        #[serde(rename = "tradeId")]
        trade_id: TradeId,
        price: String,
        quantity: String,
        side: Side,
        timestamp: TimestampMs,
    },
    Ticker(TickerPayload),
    Depth(DepthPayload),
    Kline {
        symbol: String,
        interval: String,
        kline: CandlePayload,
    },
}

impl MarketEvent {
    pub fn topic(&self) -> String {
        match self {
            MarketEvent::Trade { symbol, .. } => format!("trade@{symbol}"),
            MarketEvent::Ticker(t) => format!("ticker@{}", t.symbol),
            MarketEvent::Depth(d) => format!("depth@{}", d.symbol),
            MarketEvent::Kline {
                symbol, interval, ..
            } => format!("kline@{symbol}@{interval}"),
        }
    }
}

/// Record bound for durable storage. The engine only emits these; a
/// downstream writer owns batching and retries.
#[derive(Debug, Clone, Serialize, PartialEq, Eq)]
#[serde(tag = "type", content = "data")]
pub enum PersistenceRecord {
    #[serde(rename = "ORDER_NEW")]
    OrderNew {
        #[serde(rename = "orderId")]
        order_id: Uuid,
        #[serde(rename = "userId")]
        user_id: UserId,
        market: String,
        price: String,
        quantity: String,
        side: Side,
        timestamp: TimestampMs,
    },
    #[serde(rename = "ORDER_CANCEL")]
    OrderCancel {
        #[serde(rename = "orderId")]
        order_id: Uuid,
        market: String,
        timestamp: TimestampMs,
    },
    #[serde(rename = "TRADE")]
    Trade {
        #[serde(rename = "tradeId")]
        trade_id: TradeId,
        market: String,
        price: String,
        quantity: String,
        #[serde(rename = "buyerUserId")]
        buyer_user_id: UserId,
        #[serde(rename = "sellerUserId")]
        seller_user_id: UserId,
        timestamp: TimestampMs,
    },
    #[serde(rename = "KLINE_UPDATE")]
    KlineUpdate {
        market: String,
        interval: String,
        kline: CandlePayload,
    },
    #[serde(rename = "DEPTH_SNAPSHOT")]
    DepthSnapshot(DepthPayload),
}

/// Everything a single command produces: the caller's response plus the
/// events and records to hand to the boundary adapters.
#[derive(Debug)]
pub struct CommandOutput {
    pub response: Response,
    pub market_events: Vec<MarketEvent>,
    pub persistence: Vec<PersistenceRecord>,
}

impl CommandOutput {
    pub fn response_only(response: Response) -> Self {
        Self {
            response,
            market_events: Vec::new(),
            persistence: Vec::new(),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn create_order_deserializes() {
        let raw = r#"{
            "type": "CREATE_ORDER",
            "data": {
                "market": "CR7_USD",
                "price": "100.50",
                "quantity": "2.5",
                "side": "buy",
                "userId": "u1"
            }
        }"#;
        let cmd: Command = serde_json::from_str(raw).unwrap();
        match cmd {
            Command::CreateOrder {
                market,
                price,
                side,
                user_id,
                ..
            } => {
                assert_eq!(market, "CR7_USD");
                assert_eq!(price, "100.50");
                assert_eq!(side, Side::Buy);
                assert_eq!(user_id, "u1");
            }
            other => panic!("unexpected command: {other:?}"),
        }
    }

    #[test]
    fn get_kline_defaults_are_optional() {
        let raw = r#"{"type": "GET_KLINE", "data": {"market": "CR7_USD"}}"#;
        let cmd: Command = serde_json::from_str(raw).unwrap();
        match cmd {
            Command::GetKline {
                interval, limit, ..
            } => {
                assert!(interval.is_none());
                assert!(limit.is_none());
            }
            other => panic!("unexpected command: {other:?}"),
        }
    }

    #[test]
    fn response_serializes_with_type_and_payload() {
        let resp = Response::OrderCancelled {
            order_id: "abc".to_string(),
            executed_quantity: "0".to_string(),
            remaining_quantity: "0".to_string(),
        };
        let value = serde_json::to_value(&resp).unwrap();
        assert_eq!(value["type"], "ORDER_CANCELLED");
        assert_eq!(value["payload"]["orderId"], "abc");
        assert_eq!(value["payload"]["executedQuantity"], "0");
    }

    #[test]
    fn event_topics() {
        let depth = MarketEvent::Depth(DepthPayload {
            symbol: "CR7_USD".to_string(),
            bids: vec![],
            asks: vec![],
            timestamp: 0,
        });
        assert_eq!(depth.topic(), "depth@CR7_USD");

        let kline = MarketEvent::Kline {
            symbol: "CR7_USD".to_string(),
            interval: "1m".to_string(),
            kline: CandlePayload {
                open_time: 0,
                close_time: 59_999,
                open: "1".into(),
                high: "1".into(),
                low: "1".into(),
                close: "1".into(),
                volume: "0".into(),
                trades: 0,
                is_closed: false,
            },
        };
        assert_eq!(kline.topic(), "kline@CR7_USD@1m");
    }
}
