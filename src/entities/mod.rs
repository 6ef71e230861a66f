pub mod battle_combo;
pub mod battle_combo_move;
pub mod combo;
pub mod combo_move;
pub mod combo_tag;
pub mod dance_move;
pub mod goal;
pub mod goal_stage;
pub mod move_tag;
pub mod tag;
