use mazecrawl_core::PlayerInput;

/// Ticks between two inputs of the same bot.
const CADENCE: u64 = 3;

/// Walk, dig and loot loop every bot follows from its own offset.
const ROUTE: [PlayerInput; 10] = [
    PlayerInput::MoveForward,
    PlayerInput::MoveForward,
    PlayerInput::InteractRight,
    PlayerInput::MoveForward,
    PlayerInput::RotateRight,
    PlayerInput::RotateRight,
    PlayerInput::MoveForward,
    PlayerInput::InteractLeft,
    PlayerInput::StrafeLeft,
    PlayerInput::RotateLeft,
];

/// Input the bot sends before the given tick, if it acts on that tick.
pub(crate) fn scripted_input(bot: usize, tick: u64) -> Option<PlayerInput> {
    let bot = bot as u64;
    if (tick + bot) % CADENCE != 0 {
        return None;
    }
    let step = (tick / CADENCE + bot * 3) % ROUTE.len() as u64;
    ROUTE.get(step as usize).copied()
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn bots_act_on_staggered_ticks() {
        let acting: Vec<u64> = (0..9).filter(|tick| scripted_input(0, *tick).is_some()).collect();
        assert_eq!(acting, vec![0, 3, 6]);
        let acting: Vec<u64> = (0..9).filter(|tick| scripted_input(1, *tick).is_some()).collect();
        assert_eq!(acting, vec![2, 5, 8]);
    }

    #[test]
    fn route_repeats() {
        let cycle = CADENCE * ROUTE.len() as u64;
        for tick in (0..cycle).step_by(CADENCE as usize) {
            assert_eq!(scripted_input(0, tick), scripted_input(0, tick + cycle));
        }
    }
}
