use chatdebate_core::RoomId;

pub fn stream(room: &RoomId) -> String {
    format!("ws:rooms:{}:stream", room.as_str())
}

pub fn history(room: &RoomId) -> String {
    format!("ws:rooms:{}:history", room.as_str())
}

pub fn online(room: &RoomId) -> String {
    format!("ws:rooms:{}:online", room.as_str())
}

pub fn typing(room: &RoomId, user_id: &str) -> String {
    format!("{}{user_id}", typing_prefix(room))
}

pub fn typing_prefix(room: &RoomId) -> String {
    format!("ws:rooms:{}:typing:", room.as_str())
}

pub fn typing_pattern(room: &RoomId) -> String {
    format!("{}*", typing_prefix(room))
}

pub fn ratelimit(room: &RoomId, user_id: &str) -> String {
    format!("ratelimit:{}:{user_id}", room.as_str())
}
