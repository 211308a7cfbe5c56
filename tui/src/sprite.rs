//! Character Sprite
//!
//! Fluffel in six by three terminal cells. The face follows the expression,
//! the ears and feet follow the running animation tracks.

use companion_core::{AnimationTrack, Expression, Facing};

/// Sprite width in cells
pub const WIDTH: u16 = 6;

/// Sprite height in cells
pub const HEIGHT: u16 = 3;

/// What the sprite needs to know about the character
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub struct Pose {
    /// Current face
    pub expression: Expression,
    /// Which way it looks
    pub facing: Facing,
    /// Ear wiggle running
    pub ears: bool,
    /// Walk cycle or edge shuffle running
    pub walking: bool,
    /// Bounce, dance or head bob running
    pub bouncing: bool,
    /// Mouth animating
    pub talking: bool,
}

impl Pose {
    /// Pose from a track query
    pub fn new(
        expression: Expression,
        facing: Facing,
        is_playing: impl Fn(AnimationTrack) -> bool,
    ) -> Self {
        Self {
            expression,
            facing,
            ears: is_playing(AnimationTrack::EarWiggle),
            walking: is_playing(AnimationTrack::WalkCycle)
                || is_playing(AnimationTrack::EdgeShuffle),
            bouncing: is_playing(AnimationTrack::Bounce)
                || is_playing(AnimationTrack::DanceRoutine)
                || is_playing(AnimationTrack::HeadBob),
            talking: is_playing(AnimationTrack::MouthTalk),
        }
    }
}

/// Eyes and mouth
fn face(expression: Expression, frame: u64) -> (char, char) {
    match expression {
        Expression::Content => ('•', 'ᴗ'),
        Expression::Cheerful => ('^', 'ᴗ'),
        Expression::Focused => ('•', '_'),
        Expression::Startled => ('O', 'o'),
        Expression::Blissful => ('-', 'ᴗ'),
        Expression::Joyful => ('^', 'D'),
        Expression::Asleep => ('-', '.'),
        Expression::Talking => ('•', if frame % 2 == 0 { 'o' } else { '-' }),
    }
}

/// Three rows of exactly [`WIDTH`] characters for animation frame `frame`
#[must_use]
pub fn lines(pose: Pose, frame: u64) -> [String; 3] {
    let even = frame % 2 == 0;

    let ears = match (pose.expression, pose.ears && even) {
        (Expression::Asleep, _) => " ▲  ▲z".to_string(),
        (_, true) => " ▴  ▴ ".to_string(),
        (_, false) => " ▲  ▲ ".to_string(),
    };

    let (eye, mouth) = face(pose.expression, frame);
    let mouth = if pose.talking && !even { 'o' } else { mouth };
    let head = match pose.facing {
        Facing::Right => format!(" ({eye}{mouth}{eye})"),
        Facing::Left => format!("({eye}{mouth}{eye}) "),
    };

    let feet = if pose.walking {
        if even { " ╯  ╰ " } else { " ╰  ╯ " }
    } else if pose.bouncing && even {
        " ^  ^ "
    } else {
        " ╰──╯ "
    };

    [ears, head, feet.to_string()]
}

#[cfg(test)]
mod tests {
    use pretty_assertions::assert_eq;

    use super::*;

    fn pose(expression: Expression, facing: Facing) -> Pose {
        Pose::new(expression, facing, |_| false)
    }

    #[test]
    fn test_rows_have_fixed_width() {
        for expression in [
            Expression::Content,
            Expression::Startled,
            Expression::Asleep,
            Expression::Talking,
        ] {
            for facing in [Facing::Left, Facing::Right] {
                for frame in 0..2 {
                    for row in lines(pose(expression, facing), frame) {
                        assert_eq!(row.chars().count(), usize::from(WIDTH), "{row:?}");
                    }
                }
            }
        }
    }

    #[test]
    fn test_facing_shifts_head() {
        let right = lines(pose(Expression::Content, Facing::Right), 0);
        let left = lines(pose(Expression::Content, Facing::Left), 0);
        assert_eq!(right[1], " (•ᴗ•)");
        assert_eq!(left[1], "(•ᴗ•) ");
    }

    #[test]
    fn test_walking_alternates_feet() {
        let walking = Pose::new(Expression::Focused, Facing::Right, |t| {
            t == AnimationTrack::WalkCycle
        });
        assert!(walking.walking);
        assert_ne!(lines(walking, 0)[2], lines(walking, 1)[2]);
    }
}
