use chrono::{DateTime, Duration, Utc};
use hashbrown::HashMap;
use rand::seq::SliceRandom;
use rand::Rng;
use serde::{Deserialize, Serialize};
use tracing::info;
use uuid::Uuid;

use crate::game::state::PlayerId;
use crate::net::protocol;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum TournamentState {
    Registration,
    InProgress,
    Complete,
}

/// One pairing in a round
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum Bracket {
    Pair(PlayerId, PlayerId),
    /// Odd player out advances without playing
    Bye(PlayerId),
}

impl Bracket {
    pub fn contains(&self, player: PlayerId) -> bool {
        match *self {
            Bracket::Pair(a, b) => a == player || b == player,
            Bracket::Bye(a) => a == player,
        }
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Tournament {
    pub id: Uuid,
    pub name: String,
    pub start_time: DateTime<Utc>,
    pub end_time: DateTime<Utc>,
    pub players: Vec<PlayerId>,
    pub state: TournamentState,
    pub brackets: Vec<Bracket>,
    /// Scores for the current round
    pub scores: HashMap<PlayerId, u32>,
    pub winners: Vec<PlayerId>,
    pub current_round: u32,
}

impl Tournament {
    pub fn new(name: String, start_time: DateTime<Utc>, duration: Duration, host: PlayerId) -> Self {
        Self {
            id: Uuid::new_v4(),
            name,
            start_time,
            end_time: start_time + duration,
            players: vec![host],
            state: TournamentState::Registration,
            brackets: Vec::new(),
            scores: HashMap::new(),
            winners: Vec::new(),
            current_round: 0,
        }
    }

    /// Higher score wins, ties go to the first player, byes advance
    pub fn round_winners(&self) -> Vec<PlayerId> {
        let score = |p: &PlayerId| self.scores.get(p).copied().unwrap_or(0);
        self.brackets
            .iter()
            .map(|bracket| match bracket {
                Bracket::Pair(a, b) => {
                    if score(a) >= score(b) {
                        *a
                    } else {
                        *b
                    }
                }
                Bracket::Bye(a) => *a,
            })
            .collect()
    }

    pub fn encode(&self) -> Result<Vec<u8>, TournamentError> {
        protocol::encode(self).map_err(|e| TournamentError::Codec(e.to_string()))
    }

    pub fn decode(data: &[u8]) -> Result<Self, TournamentError> {
        protocol::decode(data).map_err(|e| TournamentError::Codec(e.to_string()))
    }
}

/// Shuffle and pair players two by two
pub fn generate_brackets<R: Rng + ?Sized>(players: &[PlayerId], rng: &mut R) -> Vec<Bracket> {
    let mut shuffled = players.to_vec();
    shuffled.shuffle(rng);

    let mut brackets = Vec::with_capacity(shuffled.len().div_ceil(2));
    let mut remaining = shuffled.into_iter();
    while let Some(first) = remaining.next() {
        brackets.push(match remaining.next() {
            Some(second) => Bracket::Pair(first, second),
            None => Bracket::Bye(first),
        });
    }
    brackets
}

#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
pub enum TournamentError {
    #[error("tournament not found")]
    NotFound,
    #[error("tournament is not the current one")]
    NotCurrent,
    #[error("tournament is {actual:?}, expected {expected:?}")]
    WrongState {
        expected: TournamentState,
        actual: TournamentState,
    },
    #[error("player already registered")]
    AlreadyRegistered,
    #[error("player is not in this round")]
    NotInRound,
    #[error("at least two players are required")]
    NotEnoughPlayers,
    #[error("tournament data: {0}")]
    Codec(String),
}

/// Local registry of tournaments and the one being played
pub struct TournamentManager {
    local_player: PlayerId,
    tournaments: HashMap<Uuid, Tournament>,
    current: Option<Uuid>,
}

impl TournamentManager {
    pub fn new(local_player: PlayerId) -> Self {
        Self {
            local_player,
            tournaments: HashMap::new(),
            current: None,
        }
    }

    pub fn current(&self) -> Option<&Tournament> {
        self.current.and_then(|id| self.tournaments.get(&id))
    }

    pub fn get(&self, id: Uuid) -> Option<&Tournament> {
        self.tournaments.get(&id)
    }

    pub fn available(&self) -> impl Iterator<Item = &Tournament> {
        self.tournaments.values()
    }

    /// Create a tournament hosted by the local player and make it current
    pub fn create_tournament(
        &mut self,
        name: impl Into<String>,
        start_time: Option<DateTime<Utc>>,
        duration: Duration,
    ) -> Uuid {
        let tournament = Tournament::new(
            name.into(),
            start_time.unwrap_or_else(Utc::now),
            duration,
            self.local_player,
        );
        let id = tournament.id;
        info!("Created tournament '{}' ({})", tournament.name, id);
        self.tournaments.insert(id, tournament);
        self.current = Some(id);
        id
    }

    /// Adopt a tournament shared by another player
    pub fn join_tournament(&mut self, data: &[u8]) -> Result<Uuid, TournamentError> {
        let mut tournament = Tournament::decode(data)?;
        if !tournament.players.contains(&self.local_player) {
            if tournament.state != TournamentState::Registration {
                return Err(TournamentError::WrongState {
                    expected: TournamentState::Registration,
                    actual: tournament.state,
                });
            }
            tournament.players.push(self.local_player);
        }
        let id = tournament.id;
        self.tournaments.insert(id, tournament);
        self.current = Some(id);
        Ok(id)
    }

    pub fn register_player(&mut self, id: Uuid, player: PlayerId) -> Result<(), TournamentError> {
        let tournament = self.tournaments.get_mut(&id).ok_or(TournamentError::NotFound)?;
        expect_state(tournament, TournamentState::Registration)?;
        if tournament.players.contains(&player) {
            return Err(TournamentError::AlreadyRegistered);
        }
        tournament.players.push(player);
        Ok(())
    }

    /// Close registration and draw the first round
    pub fn start_tournament<R: Rng + ?Sized>(&mut self, rng: &mut R) -> Result<(), TournamentError> {
        let tournament = self.current_mut()?;
        expect_state(tournament, TournamentState::Registration)?;
        if tournament.players.len() < 2 {
            return Err(TournamentError::NotEnoughPlayers);
        }
        tournament.brackets = generate_brackets(&tournament.players, rng);
        tournament.state = TournamentState::InProgress;
        info!(
            "Tournament '{}' started with {} players",
            tournament.name,
            tournament.players.len()
        );
        Ok(())
    }

    /// Record a round score; only the current in-progress tournament accepts it
    pub fn submit_score(
        &mut self,
        tournament_id: Uuid,
        player: PlayerId,
        score: u32,
    ) -> Result<(), TournamentError> {
        if self.current != Some(tournament_id) {
            return Err(TournamentError::NotCurrent);
        }
        let tournament = self.current_mut()?;
        expect_state(tournament, TournamentState::InProgress)?;
        if !tournament.brackets.iter().any(|b| b.contains(player)) {
            return Err(TournamentError::NotInRound);
        }
        tournament.scores.insert(player, score);
        Ok(())
    }

    /// Resolve the round: one winner completes the tournament
    pub fn advance_tournament<R: Rng + ?Sized>(
        &mut self,
        rng: &mut R,
    ) -> Result<TournamentState, TournamentError> {
        let tournament = self.current_mut()?;
        expect_state(tournament, TournamentState::InProgress)?;

        let winners = tournament.round_winners();
        if winners.len() <= 1 {
            tournament.state = TournamentState::Complete;
            tournament.winners = winners;
            info!("Tournament '{}' complete", tournament.name);
        } else {
            tournament.brackets = generate_brackets(&winners, rng);
            tournament.scores.clear();
            tournament.current_round += 1;
        }
        Ok(tournament.state)
    }

    fn current_mut(&mut self) -> Result<&mut Tournament, TournamentError> {
        let id = self.current.ok_or(TournamentError::NotFound)?;
        self.tournaments.get_mut(&id).ok_or(TournamentError::NotFound)
    }
}

fn expect_state(tournament: &Tournament, expected: TournamentState) -> Result<(), TournamentError> {
    if tournament.state == expected {
        Ok(())
    } else {
        Err(TournamentError::WrongState {
            expected,
            actual: tournament.state,
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use rand::rngs::StdRng;
    use rand::SeedableRng;

    fn players(n: usize) -> Vec<PlayerId> {
        (0..n).map(|_| Uuid::new_v4()).collect()
    }

    fn manager_with(n: usize) -> (TournamentManager, Uuid, Vec<PlayerId>) {
        let all = players(n);
        let mut manager = TournamentManager::new(all[0]);
        let id = manager.create_tournament("Pond Cup", None, Duration::hours(1));
        for p in &all[1..] {
            manager.register_player(id, *p).unwrap();
        }
        (manager, id, all)
    }

    #[test]
    fn test_brackets_pair_everyone_once() {
        let mut rng = StdRng::seed_from_u64(1);
        let all = players(5);
        let brackets = generate_brackets(&all, &mut rng);
        assert_eq!(brackets.len(), 3);
        assert_eq!(
            brackets.iter().filter(|b| matches!(b, Bracket::Bye(_))).count(),
            1
        );
        for p in &all {
            assert_eq!(brackets.iter().filter(|b| b.contains(*p)).count(), 1);
        }
    }

    #[test]
    fn test_tie_goes_to_first_player() {
        let (mut manager, id, _) = manager_with(2);
        let mut rng = StdRng::seed_from_u64(2);
        manager.start_tournament(&mut rng).unwrap();
        let Bracket::Pair(first, second) = manager.current().unwrap().brackets[0] else {
            panic!("expected a pair");
        };
        manager.submit_score(id, first, 5).unwrap();
        manager.submit_score(id, second, 5).unwrap();
        assert_eq!(manager.advance_tournament(&mut rng).unwrap(), TournamentState::Complete);
        assert_eq!(manager.current().unwrap().winners, vec![first]);
    }

    #[test]
    fn test_full_tournament_of_four() {
        let (mut manager, id, _) = manager_with(4);
        let mut rng = StdRng::seed_from_u64(3);
        manager.start_tournament(&mut rng).unwrap();

        // Second player of every pair wins
        for bracket in manager.current().unwrap().brackets.clone() {
            if let Bracket::Pair(_, b) = bracket {
                manager.submit_score(id, b, 10).unwrap();
            }
        }
        assert_eq!(manager.advance_tournament(&mut rng).unwrap(), TournamentState::InProgress);
        let t = manager.current().unwrap();
        assert_eq!(t.current_round, 1);
        assert_eq!(t.brackets.len(), 1);
        assert!(t.scores.is_empty());

        assert_eq!(manager.advance_tournament(&mut rng).unwrap(), TournamentState::Complete);
        assert_eq!(manager.current().unwrap().winners.len(), 1);
    }

    #[test]
    fn test_bye_advances() {
        let (mut manager, _, _) = manager_with(3);
        let mut rng = StdRng::seed_from_u64(4);
        manager.start_tournament(&mut rng).unwrap();
        let bye = manager
            .current()
            .unwrap()
            .brackets
            .iter()
            .find_map(|b| match b {
                Bracket::Bye(p) => Some(*p),
                _ => None,
            })
            .unwrap();
        manager.advance_tournament(&mut rng).unwrap();
        assert!(manager.current().unwrap().brackets.iter().any(|b| b.contains(bye)));
    }

    #[test]
    fn test_score_for_other_tournament_rejected() {
        let (mut manager, _, all) = manager_with(2);
        let mut rng = StdRng::seed_from_u64(5);
        manager.start_tournament(&mut rng).unwrap();
        assert_eq!(
            manager.submit_score(Uuid::new_v4(), all[0], 3),
            Err(TournamentError::NotCurrent)
        );
    }

    #[test]
    fn test_score_before_start_rejected() {
        let (mut manager, id, all) = manager_with(2);
        assert!(matches!(
            manager.submit_score(id, all[0], 3),
            Err(TournamentError::WrongState { .. })
        ));
    }

    #[test]
    fn test_cannot_start_alone() {
        let (mut manager, _, _) = manager_with(1);
        let mut rng = StdRng::seed_from_u64(6);
        assert_eq!(
            manager.start_tournament(&mut rng),
            Err(TournamentError::NotEnoughPlayers)
        );
    }

    #[test]
    fn test_duplicate_registration() {
        let (mut manager, id, all) = manager_with(2);
        assert_eq!(
            manager.register_player(id, all[1]),
            Err(TournamentError::AlreadyRegistered)
        );
    }

    #[test]
    fn test_join_shared_tournament() {
        let (host, id, _) = manager_with(2);
        let data = host.get(id).unwrap().encode().unwrap();

        let guest_id = Uuid::new_v4();
        let mut guest = TournamentManager::new(guest_id);
        assert_eq!(guest.join_tournament(&data).unwrap(), id);
        let joined = guest.current().unwrap();
        assert_eq!(joined.players.len(), 3);
        assert!(joined.players.contains(&guest_id));
        assert_eq!(joined.start_time, host.get(id).unwrap().start_time);
    }
}
