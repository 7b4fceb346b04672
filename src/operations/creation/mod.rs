mod make_box;
mod make_object;

pub use make_box::MakeBox;
pub use make_object::MakeObject;
