use team_tasking_core::{GamePhase, Situation, Timestamp};

/// Time the team waits after an opponent kickoff before playing the ball.
pub const KICKOFF_WAIT_MS: u64 = 0;

/// Time after an own kickoff during which nobody takes the supporter role.
pub const SUPPORTER_COOLDOWN_MS: u64 = 15_000;

/// Field-frame distance from the centre at which the local ball counts as moved.
pub const BALL_MOVE_LIMIT: f32 = 400.0;

/// Distance from the centre at which the team ball counts as moved.
pub const TEAM_BALL_MOVE_LIMIT: f32 = 500.0;

/// Age beyond which a local ball sighting is too old to judge movement.
pub const BALL_FRESHNESS_MS: u64 = 700;

/// Localization confidence required to trust the field-frame ball.
pub const MIN_POSE_VALIDITY: f32 = 0.9;

/// Tracks kickoff restrictions: whether the ball may be played and whether
/// the supporter cooldown after an own kickoff has run out.
#[derive(Clone, Debug, Default, PartialEq, Eq)]
pub struct KickoffPlan {
    ball_is_free: bool,
    ball_moved: bool,
    wait_started: Option<Timestamp>,
    cooldown_started: Timestamp,
    supporter_cooldown_elapsed: bool,
}

impl KickoffPlan {
    /// Creates a plan with the ball held and the kickoff wait armed.
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Whether the ball may be played.
    #[must_use]
    pub const fn ball_is_free(&self) -> bool {
        self.ball_is_free
    }

    /// Whether the ball has left the centre since play started.
    #[must_use]
    pub const fn ball_moved(&self) -> bool {
        self.ball_moved
    }

    /// Whether the supporter role may be handed out.
    #[must_use]
    pub const fn supporter_cooldown_elapsed(&self) -> bool {
        self.supporter_cooldown_elapsed
    }

    /// Advances the plan by one cycle.
    pub fn update(&mut self, situation: &Situation) {
        let phase = situation.game.phase;
        let opponent_kickoff = !situation.game.kickoff_us();
        let now = situation.now;

        self.observe_ball(situation);

        if phase == GamePhase::Playing && !self.ball_is_free && opponent_kickoff {
            let started = *self.wait_started.get_or_insert(now);
            self.ball_is_free = now.millis_since(started) >= KICKOFF_WAIT_MS || self.ball_moved;
        } else if phase <= GamePhase::Set && opponent_kickoff {
            self.ball_is_free = false;
            self.wait_started = None;
        } else if phase <= GamePhase::Set {
            self.ball_is_free = true;
        }

        self.supporter_cooldown_elapsed = opponent_kickoff;
        if !opponent_kickoff {
            match phase {
                GamePhase::Set => self.cooldown_started = now,
                GamePhase::Playing => {
                    self.supporter_cooldown_elapsed =
                        now.millis_since(self.cooldown_started) > SUPPORTER_COOLDOWN_MS;
                }
                _ => {}
            }
        }
    }

    fn observe_ball(&mut self, situation: &Situation) {
        if situation.game.phase != GamePhase::Playing {
            self.ball_moved = false;
            return;
        }
        if self.ball_moved || situation.now.millis_since(situation.ball.last_seen) > BALL_FRESHNESS_MS
        {
            return;
        }

        if situation.pose_validity > MIN_POSE_VALIDITY
            && situation.ball_on_field().length() > BALL_MOVE_LIMIT
        {
            self.ball_moved = true;
        }
        if situation.team_ball.position.length() > TEAM_BALL_MOVE_LIMIT {
            self.ball_moved = true;
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use team_tasking_core::{GameSnapshot, Vec2};

    fn situation(phase: GamePhase, kickoff_us: bool, now: u64) -> Situation {
        Situation {
            now: Timestamp::from_millis(now),
            pose_validity: 1.0,
            game: GameSnapshot {
                phase,
                kickoff_team: if kickoff_us { 5 } else { 6 },
                own_team: 5,
            },
            ..Situation::default()
        }
    }

    #[test]
    fn own_kickoff_frees_the_ball_before_play() {
        let mut plan = KickoffPlan::new();
        plan.update(&situation(GamePhase::Ready, true, 0));
        assert!(plan.ball_is_free());
        plan.update(&situation(GamePhase::Playing, true, 100));
        assert!(plan.ball_is_free());
    }

    #[test]
    fn opponent_kickoff_holds_the_ball_until_play_starts() {
        let mut plan = KickoffPlan::new();
        plan.update(&situation(GamePhase::Set, false, 0));
        assert!(!plan.ball_is_free());
        plan.update(&situation(GamePhase::Playing, false, 50));
        assert!(plan.ball_is_free());
    }

    #[test]
    fn supporter_cooldown_runs_from_the_set_phase() {
        let mut plan = KickoffPlan::new();
        plan.update(&situation(GamePhase::Set, true, 1_000));
        assert!(!plan.supporter_cooldown_elapsed());

        plan.update(&situation(GamePhase::Playing, true, 10_000));
        assert!(!plan.supporter_cooldown_elapsed());

        plan.update(&situation(GamePhase::Playing, true, 16_001));
        assert!(plan.supporter_cooldown_elapsed());
    }

    #[test]
    fn opponent_kickoff_never_blocks_supporters() {
        let mut plan = KickoffPlan::new();
        plan.update(&situation(GamePhase::Set, false, 1_000));
        assert!(plan.supporter_cooldown_elapsed());
    }

    #[test]
    fn fresh_ball_away_from_the_centre_is_latched_as_moved() {
        let mut plan = KickoffPlan::new();
        let mut playing = situation(GamePhase::Playing, false, 2_000);
        playing.ball.last_seen = Timestamp::from_millis(1_900);
        playing.ball.position = Vec2::new(600.0, 0.0);

        plan.update(&playing);
        assert!(plan.ball_moved());

        playing.ball.position = Vec2::ZERO;
        plan.update(&playing);
        assert!(plan.ball_moved());

        plan.update(&situation(GamePhase::Ready, false, 3_000));
        assert!(!plan.ball_moved());
    }

    #[test]
    fn stale_or_poorly_localized_sightings_are_ignored() {
        let mut plan = KickoffPlan::new();
        let mut playing = situation(GamePhase::Playing, false, 5_000);
        playing.ball.position = Vec2::new(900.0, 0.0);
        playing.ball.last_seen = Timestamp::from_millis(1_000);
        plan.update(&playing);
        assert!(!plan.ball_moved());

        playing.ball.last_seen = Timestamp::from_millis(4_900);
        playing.pose_validity = 0.5;
        plan.update(&playing);
        assert!(!plan.ball_moved());

        playing.team_ball.position = Vec2::new(0.0, 800.0);
        plan.update(&playing);
        assert!(plan.ball_moved());
    }
}
