//! The closed command vocabulary.
//!
//! Token identifiers are stable wire/storage values: template banks are keyed
//! by them and the serial protocol names them, so the declaration order here
//! must never change. New words go at the end.

/// Number of words in the vocabulary.
pub const VOCABULARY_SIZE: usize = 43;

/// A recognized vocabulary word.
///
/// Discriminants run 0..=42 in declaration order and double as the
/// template-bank token ids.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
#[repr(u16)]
pub enum Token {
    // Command words
    Set,
    Cancel,
    Add,
    Minus,
    Stop,
    // Structural keyword
    Timer,
    // Units
    Minute,
    Minutes,
    Hour,
    Hours,
    // Ones, 1..=9
    One,
    Two,
    Three,
    Four,
    Five,
    Six,
    Seven,
    Eight,
    Nine,
    // Teens, 10..=19
    Ten,
    Eleven,
    Twelve,
    Thirteen,
    Fourteen,
    Fifteen,
    Sixteen,
    Seventeen,
    Eighteen,
    Nineteen,
    // Tens, 20..=90
    Twenty,
    Thirty,
    Forty,
    Fifty,
    Sixty,
    Seventy,
    Eighty,
    Ninety,
    // Timer names
    Baking,
    Cooking,
    Break,
    Homework,
    Exercise,
    Workout,
}

impl Token {
    /// Every token in id order.
    pub const ALL: [Token; VOCABULARY_SIZE] = [
        Token::Set,
        Token::Cancel,
        Token::Add,
        Token::Minus,
        Token::Stop,
        Token::Timer,
        Token::Minute,
        Token::Minutes,
        Token::Hour,
        Token::Hours,
        Token::One,
        Token::Two,
        Token::Three,
        Token::Four,
        Token::Five,
        Token::Six,
        Token::Seven,
        Token::Eight,
        Token::Nine,
        Token::Ten,
        Token::Eleven,
        Token::Twelve,
        Token::Thirteen,
        Token::Fourteen,
        Token::Fifteen,
        Token::Sixteen,
        Token::Seventeen,
        Token::Eighteen,
        Token::Nineteen,
        Token::Twenty,
        Token::Thirty,
        Token::Forty,
        Token::Fifty,
        Token::Sixty,
        Token::Seventy,
        Token::Eighty,
        Token::Ninety,
        Token::Baking,
        Token::Cooking,
        Token::Break,
        Token::Homework,
        Token::Exercise,
        Token::Workout,
    ];

    /// Stable numeric id used by template banks and diagnostics.
    pub fn id(self) -> u16 {
        self as u16
    }

    /// Inverse of [`Token::id`]. Returns `None` for out-of-range ids.
    pub fn from_id(id: u16) -> Option<Token> {
        Self::ALL.get(id as usize).copied()
    }

    /// Lowercase spoken form, used as the template-bank key.
    pub fn name(self) -> &'static str {
        match self {
            Token::Set => "set",
            Token::Cancel => "cancel",
            Token::Add => "add",
            Token::Minus => "minus",
            Token::Stop => "stop",
            Token::Timer => "timer",
            Token::Minute => "minute",
            Token::Minutes => "minutes",
            Token::Hour => "hour",
            Token::Hours => "hours",
            Token::One => "one",
            Token::Two => "two",
            Token::Three => "three",
            Token::Four => "four",
            Token::Five => "five",
            Token::Six => "six",
            Token::Seven => "seven",
            Token::Eight => "eight",
            Token::Nine => "nine",
            Token::Ten => "ten",
            Token::Eleven => "eleven",
            Token::Twelve => "twelve",
            Token::Thirteen => "thirteen",
            Token::Fourteen => "fourteen",
            Token::Fifteen => "fifteen",
            Token::Sixteen => "sixteen",
            Token::Seventeen => "seventeen",
            Token::Eighteen => "eighteen",
            Token::Nineteen => "nineteen",
            Token::Twenty => "twenty",
            Token::Thirty => "thirty",
            Token::Forty => "forty",
            Token::Fifty => "fifty",
            Token::Sixty => "sixty",
            Token::Seventy => "seventy",
            Token::Eighty => "eighty",
            Token::Ninety => "ninety",
            Token::Baking => "baking",
            Token::Cooking => "cooking",
            Token::Break => "break",
            Token::Homework => "homework",
            Token::Exercise => "exercise",
            Token::Workout => "workout",
        }
    }

    /// Looks a token up by its spoken form.
    pub fn from_name(name: &str) -> Option<Token> {
        Self::ALL.iter().copied().find(|t| t.name() == name)
    }

    /// True for the five words that can anchor a command.
    pub fn is_command(self) -> bool {
        matches!(
            self,
            Token::Set | Token::Cancel | Token::Add | Token::Minus | Token::Stop
        )
    }

    /// Seconds per unit for the duration words.
    pub fn unit_seconds(self) -> Option<i64> {
        match self {
            Token::Minute | Token::Minutes => Some(60),
            Token::Hour | Token::Hours => Some(3600),
            _ => None,
        }
    }

    /// Value of a standalone numeral: ones and teens, 1..=19.
    pub fn small_value(self) -> Option<u32> {
        let id = self.id();
        let one = Token::One.id();
        let nineteen = Token::Nineteen.id();
        if (one..=nineteen).contains(&id) {
            Some((id - one + 1) as u32)
        } else {
            None
        }
    }

    /// Value of a tens word, 20..=90. These may compound with a
    /// following ones word ("twenty five").
    pub fn tens_value(self) -> Option<u32> {
        let id = self.id();
        let twenty = Token::Twenty.id();
        let ninety = Token::Ninety.id();
        if (twenty..=ninety).contains(&id) {
            Some((id - twenty + 2) as u32 * 10)
        } else {
            None
        }
    }

    /// Value of a ones word, 1..=9. Only these compound after a tens word.
    pub fn ones_value(self) -> Option<u32> {
        let id = self.id();
        let one = Token::One.id();
        let nine = Token::Nine.id();
        if (one..=nine).contains(&id) {
            Some((id - one + 1) as u32)
        } else {
            None
        }
    }

    /// Display form of a timer-name word ("baking" becomes "Baking").
    pub fn timer_name(self) -> Option<&'static str> {
        match self {
            Token::Baking => Some("Baking"),
            Token::Cooking => Some("Cooking"),
            Token::Break => Some("Break"),
            Token::Homework => Some("Homework"),
            Token::Exercise => Some("Exercise"),
            Token::Workout => Some("Workout"),
            _ => None,
        }
    }
}
