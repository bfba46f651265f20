use bevy::prelude::*;

use side_brawler::config::{GameConfig, CONFIG_PATH};
use side_brawler::GamePlugin;

fn main() {
    App::new()
        .add_plugins(DefaultPlugins.set(WindowPlugin {
            primary_window: Some(Window {
                title: "Side Brawler".into(),
                resolution: (1280.0, 720.0).into(),
                ..default()
            }),
            ..default()
        }))
        // After DefaultPlugins so the load is logged
        .insert_resource(GameConfig::load_or_default(CONFIG_PATH))
        .add_plugins(GamePlugin)
        .run();
}
