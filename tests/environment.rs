use fastrand::Rng;
use soft17::deck::{hand_value, Hand, Shoe, ACE};
use soft17::{Action, BlackjackEnv, Outcome};

fn assert_dealer_finished(hand: &Hand) {
    let value = hand.value();
    if value.total <= 21 {
        assert!(value.total >= 17, "dealer stood on {} {:?}", value.total, hand.cards());
        assert!(
            !(value.total == 17 && value.is_soft),
            "dealer stood on soft 17 {:?}",
            hand.cards()
        );
    }
}

#[test]
fn random_play_keeps_environment_contract() {
    let mut env = BlackjackEnv::with_seed(8, 1234);
    let mut rng = Rng::with_seed(4321);

    for _ in 0..20_000 {
        let mut state = env.reset();
        assert_eq!(state.player_hand.len(), 2);
        assert_eq!(state.dealer_hand.len(), 2);
        let showing = state.dealer_showing;
        assert_eq!(state.dealer_hand.first(), Some(showing));

        loop {
            let action = Action::random(&mut rng);
            let tx = env.step(&state, action);
            assert!((-1..=1).contains(&tx.reward));
            assert_eq!(tx.state.dealer_showing, showing);

            match action {
                Action::Draw => {
                    assert_eq!(tx.done, tx.state.player_hand.is_bust());
                    assert_eq!(tx.state.player_hand.len(), state.player_hand.len() + 1);
                }
                Action::Stand => {
                    assert!(tx.done);
                    assert_dealer_finished(&tx.state.dealer_hand);
                }
            }

            if !tx.done {
                assert_eq!(tx.outcome, None);
                assert_eq!(tx.reward, 0);
                state = tx.state;
                continue;
            }

            let outcome = tx.outcome.expect("finished episode has an outcome");
            assert_eq!(outcome.reward(), tx.reward);
            let player = tx.state.player_hand.total();
            let dealer = tx.state.dealer_hand.total();
            match outcome {
                Outcome::PlayerBust => assert!(player > 21),
                Outcome::DealerBust => assert!(dealer > 21 && player <= 21),
                Outcome::PlayerWins => assert!(player > dealer),
                Outcome::DealerWins => assert!(player < dealer),
                Outcome::Push => assert_eq!(player, dealer),
            }
            break;
        }
    }
}

#[test]
fn dealer_policy_terminates_from_every_start() {
    let mut env = BlackjackEnv::with_seed(8, 77);
    for first in 2..=ACE {
        for second in 2..=ACE {
            for _ in 0..200 {
                let mut hand = Hand::from_cards(&[first, second]);
                env.dealer_play(&mut hand);
                assert_dealer_finished(&hand);
            }
        }
    }
}

#[test]
fn soft_17_draws_but_hard_17_stands() {
    let shoe = Shoe::stacked(8, Rng::with_seed(1), &[2]);
    let mut env = BlackjackEnv::with_shoe(shoe);

    let mut soft = Hand::from_cards(&[ACE, 3, 3]);
    assert_eq!(hand_value(soft.cards()).total, 17);
    env.dealer_play(&mut soft);
    assert_eq!(soft.cards(), &[ACE, 3, 3, 2]);

    let mut hard = Hand::from_cards(&[ACE, 6, 10]);
    env.dealer_play(&mut hard);
    assert_eq!(hard.len(), 3);
}

#[test]
fn seeded_environments_replay_identically() {
    let mut a = BlackjackEnv::with_seed(6, 9);
    let mut b = BlackjackEnv::with_seed(6, 9);
    for _ in 0..500 {
        let sa = a.reset();
        let sb = b.reset();
        assert_eq!(sa, sb);
        let ta = a.step(&sa, Action::Stand);
        let tb = b.step(&sb, Action::Stand);
        assert_eq!(ta.state, tb.state);
        assert_eq!(ta.outcome, tb.outcome);
    }
}
