pub mod factory;
pub mod transport;

pub use factory::WebSocketFactory;
pub use transport::{
    CloseFrame, CloseKind, Connector, FrameSink, FrameSource, TransportEvent, TransportSocket,
};
