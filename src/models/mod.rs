// ============================================================================
// MODELS
// ============================================================================
//
//   - users : comptes (mot de passe hashé, refresh token actif, préférences)
//   - coins : catalogue, cache local des données de marché
//   - watchlists / watchlist_coins : une watchlist par utilisateur + ses cryptos
//   - portfolios / holdings : un portfolio par utilisateur + une position par crypto
//   - health : réponse de liveness
//   - dto : corps de requête, enveloppe de réponse et vues
//
// Les lignes de watchlist et de holding pointent vers la clé primaire du
// catalogue et sont jointes à `coins` à la lecture.
//
// ============================================================================

pub mod health;
pub mod users;
pub mod coins;
pub mod watchlists;
pub mod watchlist_coins;
pub mod portfolios;
pub mod holdings;
pub mod dto;
