pub mod control;
pub mod packet;

pub use packet::{MaapPacket, MessageType, PACKET_LEN};
