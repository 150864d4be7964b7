// Engine modules: asset cache and its update pump

pub mod assets;
pub mod update_loop;
