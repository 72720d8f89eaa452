use serde::{Deserialize, Serialize};

/// Rating points at stake in a single game.
pub const K_FACTOR: f64 = 32.0;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum Outcome {
    WhiteWins,
    BlackWins,
    Draw,
}

impl Outcome {
    fn white_score(self) -> f64 {
        match self {
            Outcome::WhiteWins => 1.0,
            Outcome::BlackWins => 0.0,
            Outcome::Draw => 0.5,
        }
    }
}

/// Expected score of a player rated `rating` against `opponent`.
pub fn expected_score(rating: i32, opponent: i32) -> f64 {
    1.0 / (1.0 + 10f64.powf(f64::from(opponent - rating) / 400.0))
}

/// New ratings for both players, each computed from the same pre-game
/// values. Returns `(white, black)`.
pub fn update_ratings(white_rating: i32, black_rating: i32, outcome: Outcome) -> (i32, i32) {
    let white_actual = outcome.white_score();
    let black_actual = 1.0 - white_actual;

    let white_new = f64::from(white_rating)
        + K_FACTOR * (white_actual - expected_score(white_rating, black_rating));
    let black_new = f64::from(black_rating)
        + K_FACTOR * (black_actual - expected_score(black_rating, white_rating));

    (white_new.round() as i32, black_new.round() as i32)
}

#[cfg(test)]
mod tests {
    use super::*;
    use proptest::prelude::*;
    use test_case::test_case;

    #[test_case(1200, 1200, Outcome::BlackWins, (1184, 1216); "equal ratings black wins")]
    #[test_case(1200, 1200, Outcome::WhiteWins, (1216, 1184); "equal ratings white wins")]
    #[test_case(1400, 1200, Outcome::WhiteWins, (1408, 1192); "favourite wins")]
    #[test_case(1400, 1200, Outcome::Draw, (1392, 1208); "favourite draws")]
    fn test_update_ratings(white: i32, black: i32, outcome: Outcome, expected: (i32, i32)) {
        assert_eq!(update_ratings(white, black, outcome), expected);
    }

    #[test]
    fn test_expected_scores_sum_to_one() {
        let sum = expected_score(1500, 1300) + expected_score(1300, 1500);

        assert!((sum - 1.0).abs() < 1e-9);
        assert!((expected_score(1200, 1200) - 0.5).abs() < 1e-9);
    }

    proptest! {
        #[test]
        fn prop_draw_between_equals_is_noop(rating in 100i32..3000) {
            prop_assert_eq!(update_ratings(rating, rating, Outcome::Draw), (rating, rating));
        }

        #[test]
        fn prop_decisive_result_moves_ratings_apart(
            white in 1000i32..1600,
            black in 1000i32..1600,
            white_wins in any::<bool>(),
        ) {
            let outcome = if white_wins { Outcome::WhiteWins } else { Outcome::BlackWins };

            let (new_white, new_black) = update_ratings(white, black, outcome);

            if white_wins {
                prop_assert!(new_white > white);
                prop_assert!(new_black < black);
            } else {
                prop_assert!(new_white < white);
                prop_assert!(new_black > black);
            }
        }
    }
}
