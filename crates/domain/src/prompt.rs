//! System prompt construction for the escape-room guide.

use crate::session::{GamePhase, SessionState};

/// First message of every session, shown before the player types anything.
pub const WELCOME_MESSAGE: &str = "Welcome to the Escape Room! I'm your guide. \
I'll help you pick a theme, explore the room and solve its puzzles. Type 'next' to begin!";

fn phase_instruction(phase: GamePhase) -> &'static str {
    match phase {
        GamePhase::AwaitingAge => {
            "Ask the player how old they are so you can pick the right puzzle difficulty. \
Ask only for the age, nothing else."
        }
        GamePhase::ThemeSelection => {
            "Help the player choose a theme. If they want suggestions, list exactly 5 short, \
creative themes as a numbered list with bold names, like `1. **Space Station**`. \
Then wait for them to choose."
        }
        GamePhase::ElementSelection => {
            "Describe the room for the chosen theme in two or three sentences, then list exactly \
3 interactive elements as a numbered list with bold names. Do NOT list themes. \
Wait for the player to pick one."
        }
        GamePhase::PuzzleActive => {
            "Give the player one short puzzle about the selected element. If they ask for a hint, \
give one. If their answer is right, start your reply with 'Correct!'. If it is wrong, say it \
is incorrect and suggest trying again or asking for a hint."
        }
    }
}

/// Build the system prompt for the next upstream call.
pub fn build_system_prompt(state: &SessionState) -> String {
    let theme = state.current_theme().unwrap_or("Not selected");
    let element = state.current_element().unwrap_or("Not selected");
    let solved: Vec<&str> = state.solved_elements().collect();
    let solved = if solved.is_empty() {
        "None yet".to_string()
    } else {
        solved.join(", ")
    };
    let phase = state.phase();

    format!(
        "You are EscapeRoomBot, a friendly guide in a digital escape room game.\n\
\n\
The game has three phases:\n\
1. Theme Selection - offer themes and wait for the player to choose.\n\
2. Element Selection - describe the room and offer 3 elements to explore.\n\
3. Puzzle Challenge - set a puzzle about the chosen element.\n\
\n\
Current phase: {phase}\n\
What to do now: {instruction}\n\
\n\
Theme: {theme}\n\
Element: {element}\n\
Solved elements: {solved}\n\
Difficulty: {difficulty}\n\
\n\
Rules:\n\
- Reply in English only.\n\
- Keep replies short, clear and friendly.\n\
- Never show a score, points, lives or hearts; the game tracks those itself.\n\
- Don't explain your reasoning or describe what happens behind the scenes.",
        phase = phase.as_str(),
        instruction = phase_instruction(phase),
        difficulty = state.difficulty().guidance(),
    )
}
