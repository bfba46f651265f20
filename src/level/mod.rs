use bevy::prelude::*;

pub struct LevelPlugin;

impl Plugin for LevelPlugin {
    fn build(&self, app: &mut App) {
        app.add_systems(Startup, spawn_test_level);
    }
}

#[derive(Component)]
pub struct LevelGeometry;

/// Box collider for level geometry - stores half-extents
#[derive(Component, Clone, Copy, Debug)]
pub struct BoxCollider {
    pub half_extents: Vec2,
}

/// Half width of the playable arena
pub const ARENA_HALF_WIDTH: f32 = 16.0;
pub const WALL_HEIGHT: f32 = 10.0;
/// Top surface of the ground floor
pub const GROUND_Y: f32 = 0.0;

/// Level block layout: (center, size)
pub fn arena_layout() -> Vec<(Vec2, Vec2)> {
    let wall_thickness = 1.0;
    let floor_thickness = 1.0;

    vec![
        // Floor
        (
            Vec2::new(0.0, GROUND_Y - floor_thickness / 2.0),
            Vec2::new(ARENA_HALF_WIDTH * 2.0 + wall_thickness * 2.0, floor_thickness),
        ),
        // West wall
        (
            Vec2::new(-ARENA_HALF_WIDTH - wall_thickness / 2.0, WALL_HEIGHT / 2.0),
            Vec2::new(wall_thickness, WALL_HEIGHT),
        ),
        // East wall
        (
            Vec2::new(ARENA_HALF_WIDTH + wall_thickness / 2.0, WALL_HEIGHT / 2.0),
            Vec2::new(wall_thickness, WALL_HEIGHT),
        ),
        // Platforms
        (Vec2::new(-8.0, 2.5), Vec2::new(5.0, 0.5)),
        (Vec2::new(7.0, 4.0), Vec2::new(6.0, 0.5)),
        // Low block the patrol turns around at
        (Vec2::new(3.0, 0.5), Vec2::new(1.0, 1.0)),
    ]
}

fn spawn_test_level(mut commands: Commands) {
    let color = Color::srgb(0.45, 0.4, 0.35);

    for (center, size) in arena_layout() {
        commands.spawn((
            Sprite {
                color,
                custom_size: Some(size),
                ..default()
            },
            Transform::from_translation(center.extend(0.0)),
            LevelGeometry,
            BoxCollider {
                half_extents: size / 2.0,
            },
        ));
    }
}
