pub mod creation;
pub mod vertex_move;
