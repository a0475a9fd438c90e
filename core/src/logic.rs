use rand::prelude::*;
use rand::rngs::SmallRng;
use serde::{Deserialize, Serialize};
use std::collections::{HashSet, VecDeque};
use web_time::Instant;

use crate::*;

#[derive(Copy, Clone, Debug, Default, PartialEq, Eq, Serialize, Deserialize)]
pub enum GameState {
    #[default]
    Ready,
    Playing,
    Won,
    Lost,
}

impl GameState {
    pub const fn is_ready(self) -> bool {
        matches!(self, Self::Ready)
    }

    pub const fn is_finished(self) -> bool {
        matches!(self, Self::Won | Self::Lost)
    }
}

/// Runs one game at a time on top of a [`Board`] and a [`Timer`].
///
/// Mines are only laid out on the first reveal, away from the revealed cell, so the
/// first click is always safe. Once the game is won or lost the board is frozen until
/// [`GameLogic::new_game`].
#[derive(Clone, Debug)]
pub struct GameLogic {
    board: Board,
    timer: Timer,
    state: GameState,
    first_click: bool,
    difficulty: Difficulty,
    rng: SmallRng,
    events: Vec<GameEvent>,
}

impl GameLogic {
    pub fn new(difficulty: Difficulty) -> Self {
        Self::with_rng(difficulty, SmallRng::seed_from_u64(rand::random()))
    }

    /// Same as [`GameLogic::new`] with a reproducible mine placement sequence.
    pub fn with_seed(difficulty: Difficulty, seed: u64) -> Self {
        Self::with_rng(difficulty, SmallRng::seed_from_u64(seed))
    }

    pub fn from_settings(settings: &GameSettings) -> Self {
        match settings.seed {
            Some(seed) => Self::with_seed(settings.difficulty, seed),
            None => Self::new(settings.difficulty),
        }
    }

    fn with_rng(difficulty: Difficulty, rng: SmallRng) -> Self {
        let config = difficulty.config();
        Self {
            board: Board::new(config.rows, config.cols),
            timer: Timer::new(config.time_limit_secs),
            state: Default::default(),
            first_click: true,
            difficulty,
            rng,
            events: Vec::new(),
        }
    }

    pub fn state(&self) -> GameState {
        self.state
    }

    pub fn is_finished(&self) -> bool {
        self.state.is_finished()
    }

    pub fn board(&self) -> &Board {
        &self.board
    }

    pub fn timer(&self) -> &Timer {
        &self.timer
    }

    pub fn difficulty(&self) -> Difficulty {
        self.difficulty
    }

    pub fn difficulty_config(&self) -> DifficultyConfig {
        self.difficulty.config()
    }

    pub fn is_first_click(&self) -> bool {
        self.first_click
    }

    /// Mines not yet flagged, negative when more cells are flagged than there are mines.
    pub fn mines_left(&self) -> isize {
        (self.board.total_mines() as isize) - (self.board.flagged_count() as isize)
    }

    /// Drains the audio cues emitted since the last call, oldest first.
    pub fn take_events(&mut self) -> Vec<GameEvent> {
        core::mem::take(&mut self.events)
    }

    pub fn set_difficulty(&mut self, difficulty: Difficulty) {
        log::debug!("Difficulty changed from {} to {}", self.difficulty, difficulty);
        self.difficulty = difficulty;
        self.new_game();
    }

    /// Switches to the named preset, unknown names leave the current game untouched.
    pub fn set_difficulty_by_name(&mut self, name: &str) {
        match name.parse() {
            Ok(difficulty) => self.set_difficulty(difficulty),
            Err(err) => log::debug!("Ignoring difficulty change: {}", err),
        }
    }

    /// Clears the board and timer and waits for the first reveal again.
    pub fn new_game(&mut self) {
        let config = self.difficulty.config();

        if self.board.size() == config.size() {
            self.board.reset();
        } else {
            self.board = Board::new(config.rows, config.cols);
        }
        self.timer.reset(Some(config.time_limit_secs));
        self.state = GameState::Ready;
        self.first_click = true;
        log::debug!(
            "New {} game: {}x{}, {} mines, {}s",
            self.difficulty,
            config.rows,
            config.cols,
            config.mines,
            config.time_limit_secs
        );
    }

    /// Advances the timer, ending a running game as lost once time is up.
    pub fn update(&mut self) -> TimerEvent {
        self.update_at(Instant::now())
    }

    pub fn update_at(&mut self, now: Instant) -> TimerEvent {
        let event = self.timer.update_at(now);

        if event.is_expired() && matches!(self.state, GameState::Playing) {
            log::debug!("Time is up");
            self.game_over(false);
        }

        event
    }

    /// Reveals the cell at `coords`, flood-filling from cells with no adjacent mines.
    pub fn reveal(&mut self, coords: Coord2) -> RevealOutcome {
        use RevealOutcome::*;

        match self.board.cell(coords) {
            Some(cell) if cell.is_revealable() => {}
            _ => return NoChange,
        }

        if self.state.is_finished() {
            return NoChange;
        }

        if self.first_click && !self.start_game(coords) {
            return NoChange;
        }

        let Some(cell) = self.board.cell_mut(coords) else {
            return NoChange;
        };
        cell.is_revealed = true;
        let (is_mine, neighbor_mines) = (cell.is_mine, cell.neighbor_mines);
        log::trace!("Revealed {:?}, mine: {}, count: {}", coords, is_mine, neighbor_mines);
        self.events.push(GameEvent::Click);

        if is_mine {
            self.events.push(GameEvent::Mine);
            self.game_over(false);
            return HitMine;
        }

        if neighbor_mines == 0 {
            self.flood_fill(coords);
        }

        if self.board.safe_cells_left() == 0 {
            self.game_over(true);
            Won
        } else {
            Revealed
        }
    }

    /// Lays out the mines around the first revealed cell and starts the clock.
    fn start_game(&mut self, first: Coord2) -> bool {
        let mines = self.difficulty.config().mines;

        if let Err(err) = self.board.place_mines(mines, first, &mut self.rng) {
            log::error!("Could not start game: {}", err);
            return false;
        }

        self.first_click = false;
        self.state = GameState::Playing;
        self.timer.start();
        log::debug!("Game started at {:?} with {} mines", first, mines);
        true
    }

    /// Opens every cell reachable from `start` through cells with no adjacent mines.
    ///
    /// Numbered cells are opened but not expanded, flagged and mine cells are skipped.
    fn flood_fill(&mut self, start: Coord2) {
        let mut visited = HashSet::from([start]);
        let mut to_visit: VecDeque<_> = self.board.neighbors(start).collect();
        let mut opened = 0;

        while let Some(visit_coords) = to_visit.pop_front() {
            if !visited.insert(visit_coords) {
                continue;
            }

            let Some(cell) = self.board.cell_mut(visit_coords) else {
                continue;
            };
            if cell.is_revealed || cell.is_flagged || cell.is_mine {
                continue;
            }

            cell.is_revealed = true;
            opened += 1;

            if cell.neighbor_mines == 0 {
                to_visit.extend(
                    self.board
                        .neighbors(visit_coords)
                        .filter(|pos| !visited.contains(pos)),
                );
            }
        }

        log::trace!("Flood fill from {:?} opened {} cells", start, opened);
    }

    /// Flags or unflags a hidden cell.
    pub fn toggle_flag(&mut self, coords: Coord2) -> MarkOutcome {
        if self.state.is_finished() {
            return MarkOutcome::NoChange;
        }

        let Some(cell) = self.board.cell_mut(coords) else {
            return MarkOutcome::NoChange;
        };
        if cell.is_revealed {
            return MarkOutcome::NoChange;
        }

        cell.is_flagged = !cell.is_flagged;
        log::trace!("Flag at {:?}: {}", coords, cell.is_flagged);
        self.events.push(GameEvent::Flag);
        MarkOutcome::Changed
    }

    /// Ends the game and stops the clock, a loss also uncovers every mine.
    ///
    /// Has no effect on a game that already ended.
    pub fn game_over(&mut self, won: bool) {
        if self.state.is_finished() {
            return;
        }

        self.timer.stop();
        if won {
            self.state = GameState::Won;
            self.events.push(GameEvent::Win);
        } else {
            self.state = GameState::Lost;
            self.events.push(GameEvent::GameOver);
            self.reveal_mines();
        }
        log::debug!(
            "Game {} with {}s left",
            if won { "won" } else { "lost" },
            self.timer.time_left()
        );
    }

    fn reveal_mines(&mut self) {
        for (_, cell) in self.board.iter_mut() {
            if cell.is_mine {
                cell.is_revealed = true;
            }
        }
    }

    /// Reveals the cell under a primary click. Returns whether anything changed.
    pub fn handle_left_click<M: ScreenMapper + ?Sized>(
        &mut self,
        x: i32,
        y: i32,
        mapper: &M,
    ) -> bool {
        if self.state.is_finished() {
            return false;
        }

        match Self::map_click(x, y, mapper) {
            Some(coords) => self.reveal(coords).has_update(),
            None => false,
        }
    }

    /// Toggles the flag under a secondary click. Returns whether anything changed.
    pub fn handle_right_click<M: ScreenMapper + ?Sized>(
        &mut self,
        x: i32,
        y: i32,
        mapper: &M,
    ) -> bool {
        if self.state.is_finished() {
            return false;
        }

        match Self::map_click(x, y, mapper) {
            Some(coords) => self.toggle_flag(coords).has_update(),
            None => false,
        }
    }

    fn map_click<M: ScreenMapper + ?Sized>(x: i32, y: i32, mapper: &M) -> Option<Coord2> {
        let mapped = mapper.screen_to_board(x, y).map(|(col, row)| (row, col));
        if mapped.is_none() {
            log::trace!("Click at ({}, {}) missed the board", x, y);
        }
        mapped
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use core::time::Duration;

    /// Easy game already in progress on a hand-made layout.
    fn playing(size: Coord2, mines: &[Coord2]) -> GameLogic {
        let mut game = GameLogic::with_seed(Difficulty::Easy, 0);
        game.board = Board::from_mine_coords(size, mines).unwrap();
        game.first_click = false;
        game.state = GameState::Playing;
        game.timer.start();
        game
    }

    fn column_wall() -> Vec<Coord2> {
        (0..10).map(|row| (row, 5)).collect()
    }

    struct FixedMapper(Option<(Coord, Coord)>);

    impl ScreenMapper for FixedMapper {
        fn screen_to_board(&self, _x: i32, _y: i32) -> Option<(Coord, Coord)> {
            self.0
        }
    }

    #[test]
    fn new_game_starts_ready() {
        let game = GameLogic::new(Difficulty::Easy);

        assert_eq!(game.state(), GameState::Ready);
        assert!(game.is_first_click());
        assert_eq!(game.difficulty(), Difficulty::Easy);
        assert_eq!(game.board().size(), (10, 10));
        assert_eq!(game.board().total_mines(), 0);
        assert_eq!(game.timer().time_left(), 900);
        assert!(!game.timer().is_running());
    }

    #[test]
    fn set_difficulty_switches_preset() {
        let mut game = GameLogic::new(Difficulty::Easy);

        game.set_difficulty_by_name("hard");
        assert_eq!(game.difficulty(), Difficulty::Hard);
        assert_eq!(game.difficulty_config().mines, 40);
        assert_eq!(game.board().size(), (16, 16));
        assert_eq!(game.timer().duration(), 600);

        game.set_difficulty(Difficulty::Easy);
        assert_eq!(game.difficulty_config().time_limit_secs, 900);
        assert_eq!(game.board().size(), (10, 10));
    }

    #[test]
    fn unknown_difficulty_is_ignored() {
        let mut game = GameLogic::with_seed(Difficulty::Hard, 1);
        game.reveal((3, 3));

        game.set_difficulty_by_name("expert");

        assert_eq!(game.difficulty(), Difficulty::Hard);
        assert_ne!(game.state(), GameState::Ready);
        assert!(game.board().revealed_count() > 0);
    }

    #[test]
    fn new_game_resets_progress() {
        let mut game = GameLogic::with_seed(Difficulty::Easy, 2);
        game.reveal((5, 5));
        game.toggle_flag((0, 0));

        game.new_game();

        assert_eq!(game.state(), GameState::Ready);
        assert!(game.is_first_click());
        assert_eq!(game.board().revealed_count(), 0);
        assert_eq!(game.board().flagged_count(), 0);
        assert_eq!(game.board().total_mines(), 0);
        assert_eq!(game.timer().time_left(), 900);
        assert!(!game.timer().is_running());
    }

    #[test]
    fn first_reveal_is_never_a_mine() {
        for difficulty in Difficulty::ALL {
            let (rows, cols) = difficulty.config().size();
            for seed in 0..50u64 {
                let coords = ((seed % rows as u64) as Coord, (seed * 7 % cols as u64) as Coord);
                let mut game = GameLogic::with_seed(difficulty, seed);

                let outcome = game.reveal(coords);

                assert_ne!(outcome, RevealOutcome::HitMine, "seed {}", seed);
                assert!(!game.board().cell(coords).unwrap().is_mine());
                assert_eq!(game.board().total_mines(), difficulty.config().mines);
                assert!(!game.is_first_click());
                assert!(matches!(game.state(), GameState::Playing | GameState::Won));
                assert!(game.timer().is_running() || game.state() == GameState::Won);
            }
        }
    }

    #[test]
    fn same_seed_lays_out_same_mines() {
        let settings = GameSettings {
            difficulty: Difficulty::Hard,
            seed: Some(77),
        };
        let mut a = GameLogic::from_settings(&settings);
        let mut b = GameLogic::from_settings(&settings);

        a.reveal((8, 8));
        b.reveal((8, 8));

        assert_eq!(a.board(), b.board());
    }

    #[test]
    fn toggle_flag_twice_restores_state() {
        let mut game = playing((10, 10), &column_wall());
        assert_eq!(game.mines_left(), 10);

        assert_eq!(game.toggle_flag((0, 0)), MarkOutcome::Changed);
        assert!(game.board().cell((0, 0)).unwrap().is_flagged());
        assert_eq!(game.mines_left(), 9);

        assert_eq!(game.toggle_flag((0, 0)), MarkOutcome::Changed);
        assert!(!game.board().cell((0, 0)).unwrap().is_flagged());
        assert_eq!(game.mines_left(), 10);
        assert_eq!(game.take_events(), vec![GameEvent::Flag, GameEvent::Flag]);
    }

    #[test]
    fn flagging_revealed_or_missing_cell_is_noop() {
        let mut game = playing((10, 10), &column_wall());
        game.reveal((0, 0));
        game.take_events();

        assert_eq!(game.toggle_flag((0, 0)), MarkOutcome::NoChange);
        assert_eq!(game.toggle_flag((10, 0)), MarkOutcome::NoChange);
        assert!(!game.board().cell((0, 0)).unwrap().is_flagged());
        assert!(game.take_events().is_empty());
    }

    #[test]
    fn over_flagging_goes_negative() {
        let mut game = GameLogic::new(Difficulty::Easy);

        game.toggle_flag((0, 0));
        game.toggle_flag((0, 1));

        assert_eq!(game.state(), GameState::Ready);
        assert_eq!(game.mines_left(), -2);
    }

    #[test]
    fn flagged_cell_cannot_be_revealed() {
        let mut game = playing((10, 10), &column_wall());
        game.toggle_flag((0, 0));

        assert_eq!(game.reveal((0, 0)), RevealOutcome::NoChange);
        assert!(!game.board().cell((0, 0)).unwrap().is_revealed());
    }

    #[test]
    fn flood_fill_stops_at_numbered_border() {
        let mut game = playing((10, 10), &column_wall());

        assert_eq!(game.reveal((0, 0)), RevealOutcome::Revealed);

        for (coords, cell) in game.board().iter() {
            assert_eq!(cell.is_revealed(), coords.1 < 5, "at {:?}", coords);
        }
        assert_eq!(game.board().cell((3, 4)).unwrap().neighbor_mines(), 3);
        assert_eq!(game.board().revealed_count(), 50);
        assert_eq!(game.state(), GameState::Playing);
    }

    #[test]
    fn flood_fill_skips_flagged_cells() {
        let mut game = playing((10, 10), &column_wall());
        game.toggle_flag((5, 0));

        game.reveal((0, 0));

        assert!(!game.board().cell((5, 0)).unwrap().is_revealed());
        assert!(game.board().cell((9, 0)).unwrap().is_revealed());
        assert_eq!(game.board().revealed_count(), 49);
    }

    #[test]
    fn numbered_cell_reveals_alone() {
        let mut game = playing((10, 10), &column_wall());

        assert_eq!(game.reveal((4, 4)), RevealOutcome::Revealed);

        assert_eq!(game.board().revealed_count(), 1);
        assert_eq!(game.reveal((4, 4)), RevealOutcome::NoChange);
    }

    #[test]
    fn revealing_every_safe_cell_wins() {
        let mut game = playing((10, 10), &column_wall());

        assert_eq!(game.reveal((0, 0)), RevealOutcome::Revealed);
        assert_eq!(game.state(), GameState::Playing);
        assert_eq!(game.reveal((0, 9)), RevealOutcome::Won);

        assert_eq!(game.state(), GameState::Won);
        assert!(!game.timer().is_running());
        assert_eq!(game.board().revealed_count(), 90);
        assert!(game.take_events().ends_with(&[GameEvent::Click, GameEvent::Win]));
    }

    #[test]
    fn single_reveal_can_win_whole_board() {
        let mut game = playing((10, 10), &[(0, 9)]);

        assert_eq!(game.reveal((9, 0)), RevealOutcome::Won);
        assert_eq!(game.board().revealed_count(), 99);
        assert!(!game.board().cell((0, 9)).unwrap().is_revealed());
    }

    #[test]
    fn win_is_not_declared_early() {
        let mines = [
            (0, 0),
            (2, 2),
            (4, 4),
            (6, 6),
            (8, 8),
            (9, 0),
            (0, 9),
            (5, 1),
            (1, 7),
            (7, 3),
        ];
        let mut game = playing((10, 10), &mines);
        let safe: Vec<Coord2> = game
            .board()
            .iter()
            .filter(|(_, cell)| !cell.is_mine())
            .map(|(coords, _)| coords)
            .collect();

        for coords in safe {
            assert_eq!(game.state(), GameState::Playing);
            game.reveal(coords);
        }

        assert_eq!(game.state(), GameState::Won);
        assert_eq!(game.board().revealed_count(), 90);
    }

    #[test]
    fn hitting_a_mine_loses_and_uncovers_all_mines() {
        let mut game = playing((10, 10), &column_wall());
        game.toggle_flag((9, 5));
        game.take_events();

        assert_eq!(game.reveal((0, 5)), RevealOutcome::HitMine);

        assert_eq!(game.state(), GameState::Lost);
        assert!(!game.timer().is_running());
        for (coords, cell) in game.board().iter() {
            assert_eq!(cell.is_revealed(), cell.is_mine(), "at {:?}", coords);
        }
        let flagged_mine = game.board().cell((9, 5)).unwrap();
        assert!(flagged_mine.is_flagged() && flagged_mine.is_revealed());
        assert_eq!(
            game.take_events(),
            vec![GameEvent::Click, GameEvent::Mine, GameEvent::GameOver]
        );
    }

    #[test]
    fn finished_game_rejects_moves() {
        let mut game = playing((10, 10), &column_wall());
        game.reveal((0, 5));
        let board = game.board().clone();

        assert_eq!(game.reveal((0, 0)), RevealOutcome::NoChange);
        assert_eq!(game.toggle_flag((0, 0)), MarkOutcome::NoChange);
        assert_eq!(game.board(), &board);

        game.game_over(true);
        assert_eq!(game.state(), GameState::Lost);
    }

    #[test]
    fn timer_expiry_loses_running_game() {
        let mut game = playing((10, 10), &column_wall());
        game.reveal((0, 0));
        game.take_events();

        let now = Instant::now();
        assert!(matches!(game.update_at(now), TimerEvent::Ticked(_)));
        assert_eq!(game.update_at(now + Duration::from_secs(901)), TimerEvent::Expired);

        assert_eq!(game.state(), GameState::Lost);
        assert!(game.timer().is_expired());
        assert_eq!(game.take_events(), vec![GameEvent::GameOver]);
        assert!(
            game.board()
                .iter()
                .filter(|(_, cell)| cell.is_mine())
                .all(|(_, cell)| cell.is_revealed())
        );
    }

    #[test]
    fn timer_does_not_run_before_first_reveal() {
        let mut game = GameLogic::new(Difficulty::Hard);

        let event = game.update_at(Instant::now() + Duration::from_secs(10_000));

        assert_eq!(event, TimerEvent::Unchanged);
        assert_eq!(game.state(), GameState::Ready);
        assert_eq!(game.timer().time_left(), 600);
    }

    #[test]
    fn clicks_map_to_row_and_column() {
        let mut game = playing((10, 10), &column_wall());

        assert!(game.handle_left_click(0, 0, &FixedMapper(Some((4, 2)))));
        assert!(game.board().cell((2, 4)).unwrap().is_revealed());
        assert!(!game.handle_left_click(0, 0, &FixedMapper(Some((4, 2)))));

        assert!(game.handle_right_click(0, 0, &FixedMapper(Some((9, 1)))));
        assert!(game.board().cell((1, 9)).unwrap().is_flagged());
        assert!(!game.handle_left_click(0, 0, &FixedMapper(Some((9, 1)))));
    }

    #[test]
    fn clicks_off_the_board_are_ignored() {
        let mut game = GameLogic::new(Difficulty::Easy);

        assert!(!game.handle_left_click(0, 0, &FixedMapper(None)));
        assert!(!game.handle_left_click(0, 0, &FixedMapper(Some((10, 0)))));
        assert!(!game.handle_right_click(0, 0, &FixedMapper(Some((0, 200)))));
        assert_eq!(game.state(), GameState::Ready);
        assert!(game.take_events().is_empty());
    }

    #[test]
    fn geometry_click_starts_game() {
        let geometry = BoardGeometry::default();
        let mut game = GameLogic::with_seed(Difficulty::Easy, 11);
        let (x, y) = geometry.board_to_screen((6, 2));

        assert!(game.handle_left_click(x + 5, y + 5, &geometry));

        assert!(game.board().cell((6, 2)).unwrap().is_revealed());
        assert_eq!(game.take_events().first(), Some(&GameEvent::Click));
    }

    #[test]
    fn clicks_after_game_end_are_ignored() {
        let mut game = playing((10, 10), &column_wall());
        game.reveal((0, 5));

        assert!(!game.handle_left_click(0, 0, &FixedMapper(Some((0, 0)))));
        assert!(!game.handle_right_click(0, 0, &FixedMapper(Some((0, 0)))));
    }
}
