pub mod drag;
pub mod groups;
pub mod pathway;
pub mod site;
