pub mod animationfile;
pub mod modelfile;
pub mod proplist;
pub mod skeletonfile;
pub mod terrainfile;
