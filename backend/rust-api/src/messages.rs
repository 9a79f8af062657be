//! User-facing messages, localized in Arabic.
//!
//! Services and handlers reference these constants instead of inlining
//! strings so every response stays consistently localized.

// Auth
pub const INVALID_CREDENTIALS: &str = "البريد الإلكتروني أو كلمة المرور غير صحيحة";
pub const EMAIL_TAKEN: &str = "البريد الإلكتروني مستخدم بالفعل";
pub const REGISTER_SUCCESS: &str = "تم إنشاء الحساب بنجاح";
pub const TOO_MANY_ATTEMPTS: &str = "محاولات كثيرة فاشلة، يرجى المحاولة لاحقاً";
pub const UNAUTHORIZED: &str = "غير مصرح لك";
pub const FORBIDDEN: &str = "ليس لديك صلاحية للقيام بهذا الإجراء";
pub const PASSWORD_CHANGED: &str = "تم تغيير كلمة المرور بنجاح";
pub const INVALID_OLD_PASSWORD: &str = "كلمة المرور الحالية غير صحيحة";

// Users
pub const USER_NOT_FOUND: &str = "المستخدم غير موجود";
pub const LAST_ADMIN_PROTECTED: &str = "لا يمكن إزالة آخر مسؤول في النظام";

// Courses
pub const COURSE_NOT_FOUND: &str = "الدورة غير موجودة";
pub const IMAGE_REQUIRED: &str = "صورة الدورة مطلوبة";
pub const INVALID_LEVEL: &str = "مستوى الدورة غير صالح";
pub const COURSE_CREATE_FAILED: &str = "حدث خطأ أثناء إنشاء الدورة";

// Enrollments
pub const ALREADY_ENROLLED: &str = "أنت مسجل بالفعل في هذه الدورة";
pub const ENROLLMENT_IDS_REQUIRED: &str = "معرف الدورة والتمرين مطلوبان";
pub const ENROLLMENT_FAILED: &str = "حدث خطأ أثناء التسجيل في الدورة";

// Progress
pub const PROGRESS_UPDATE_FAILED: &str = "حدث خطأ أثناء تحديث التقدم";
pub const PROGRESS_FETCH_FAILED: &str = "حدث خطأ أثناء جلب التقدم";
pub const NEXT_LESSON_PREFIX: &str = "الدرس التالي";

// Exercises & quizzes
pub const LESSON_NOT_FOUND: &str = "الدرس غير موجود";
pub const EXERCISE_NOT_FOUND: &str = "التمرين غير موجود";
pub const QUIZ_NOT_FOUND: &str = "الاختبار غير موجود";
pub const MISSING_FIELDS: &str = "بعض الحقول المطلوبة مفقودة";

// Generic
pub const INTERNAL_ERROR: &str = "حدث خطأ في الخادم";
